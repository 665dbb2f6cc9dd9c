use crate::cli::ServeArgs;
use crate::infra::{
    AppState, BuiltinTemplates, ConcatPdfMerger, InMemoryDirectoryStore, InMemoryDossierStore,
    InMemoryEquivalenceStore, MailLog,
};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tenure_track::config::AppConfig;
use tenure_track::error::AppError;
use tenure_track::telemetry;
use tenure_track::workflows::directory::DirectoryService;
use tenure_track::workflows::dossier::DossierService;
use tenure_track::workflows::equivalence::EquivalenceService;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(DirectoryService::new(Arc::new(
        InMemoryDirectoryStore::default(),
    )));
    let mail = Arc::new(MailLog::default());

    let dossiers = Arc::new(DossierService::new(
        directory.clone(),
        Arc::new(InMemoryDossierStore::default()),
        mail.clone(),
        Box::new(BuiltinTemplates::default()),
        Box::new(ConcatPdfMerger),
        config.notifications.clone(),
    ));
    let equivalences = Arc::new(EquivalenceService::new(
        Arc::new(InMemoryEquivalenceStore::default()),
        directory,
        mail,
        Box::new(BuiltinTemplates::default()),
        config.notifications.clone(),
    ));

    let app = with_workflow_routes(dossiers, equivalences)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "tenure-track records service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
