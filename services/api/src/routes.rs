use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use tenure_track::workflows::directory::DirectoryStore;
use tenure_track::workflows::dossier::{dossier_router, DossierService, DossierStore, MailTransport};
use tenure_track::workflows::equivalence::{
    equivalence_router, EquivalenceService, EquivalenceStore,
};

use crate::infra::AppState;

/// Compose the feature routers with the runtime endpoints.
pub(crate) fn with_workflow_routes<D, S, E, M>(
    dossiers: Arc<DossierService<D, S, M>>,
    equivalences: Arc<EquivalenceService<E, D, M>>,
) -> axum::Router
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    E: EquivalenceStore + 'static,
    M: MailTransport + 'static,
{
    dossier_router(dossiers)
        .merge(equivalence_router(equivalences))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
