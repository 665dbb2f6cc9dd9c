use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;

use crate::workflows::directory::{
    DirectoryServiceError, DirectoryStore, FacultyFilter, NewPosition, PositionId,
    RepositoryError, StoredFile,
};

use super::domain::{DossierId, DossierStatus, EvaluationId, FormId};
use super::documents::MailTransport;
use super::report::{DashboardQuery, FormView};
use super::repository::DossierStore;
use super::service::{
    CommitteeIntake, DossierService, DossierServiceError, GeneratedDocument, OpenDossier,
    ResolutionIntake,
};

/// Router builder exposing the dossier workflow endpoints.
pub fn dossier_router<D, S, M>(service: Arc<DossierService<D, S, M>>) -> Router
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route(
            "/api/v1/dossiers",
            get(dashboard_handler::<D, S, M>).post(open_handler::<D, S, M>),
        )
        .route("/api/v1/dossiers/:dossier_id", get(detail_handler::<D, S, M>))
        .route(
            "/api/v1/dossiers/:dossier_id/docket",
            post(docket_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/resolutions",
            post(resolution_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/evaluations",
            post(start_evaluation_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/close",
            post(close_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/committee",
            post(committee_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/reminders",
            post(reminder_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/bundle",
            get(bundle_handler::<D, S, M>),
        )
        .route(
            "/api/v1/dossiers/:dossier_id/jury-sheet",
            get(jury_sheet_handler::<D, S, M>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/schedule",
            post(schedule_handler::<D, S, M>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/notify",
            post(notify_committee_handler::<D, S, M>),
        )
        .route("/api/v1/forms/:form_id/submit", post(submit_form_handler::<D, S, M>))
        .route(
            "/api/v1/forms/:form_id/template",
            get(form_template_handler::<D, S, M>),
        )
        .route("/api/v1/faculty", get(faculty_picker_handler::<D, S, M>))
        .with_state(service)
}

fn error_response(error: DossierServiceError) -> Response {
    let status = match &error {
        DossierServiceError::Rule(_)
        | DossierServiceError::Committee(_)
        | DossierServiceError::MissingPrimaryEmail(_)
        | DossierServiceError::MissingCommittee
        | DossierServiceError::NothingToSend(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DossierServiceError::Directory(DirectoryServiceError::InvalidEmail(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DossierServiceError::Directory(DirectoryServiceError::UnknownFaculty)
        | DossierServiceError::Directory(DirectoryServiceError::UnknownCourse)
        | DossierServiceError::Directory(DirectoryServiceError::UnknownPosition)
        | DossierServiceError::DossierNotFound
        | DossierServiceError::FormNotFound
        | DossierServiceError::EvaluationNotFound
        | DossierServiceError::PositionNotFound => StatusCode::NOT_FOUND,
        DossierServiceError::Repository(RepositoryError::Conflict)
        | DossierServiceError::Directory(DirectoryServiceError::Repository(
            RepositoryError::Conflict,
        )) => StatusCode::CONFLICT,
        DossierServiceError::Mail(_) | DossierServiceError::Pdf(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn download(document: GeneratedDocument) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenDossierRequest {
    #[serde(default)]
    pub(crate) position: Option<u64>,
    #[serde(default)]
    pub(crate) new_position: Option<NewPosition>,
    #[serde(default)]
    pub(crate) docket: Option<String>,
}

pub(crate) async fn open_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    axum::Json(request): axum::Json<OpenDossierRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let result = match (request.position, request.new_position) {
        (Some(position), _) => service.open_dossier(OpenDossier {
            position: PositionId(position),
            docket: request.docket,
        }),
        (None, Some(new_position)) => service.open_with_new_position(new_position, request.docket),
        (None, None) => {
            let payload = json!({ "error": "either position or new_position is required" });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match result {
        Ok(dossier) => (StatusCode::CREATED, axum::Json(dossier)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardRequest {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<DossierStatus>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn dashboard_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Query(request): Query<DashboardRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let query = DashboardQuery {
        search: request.search,
        status: request.status,
    };
    match service.dashboard(&query, today) {
        Ok(board) => (StatusCode::OK, axum::Json(board)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = Local::now().date_naive();
    match service.detail(DossierId(dossier_id), today) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocketRequest {
    pub(crate) docket: String,
}

pub(crate) async fn docket_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
    axum::Json(request): axum::Json<DocketRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.assign_docket(DossierId(dossier_id), &request.docket) {
        Ok(dossier) => (StatusCode::OK, axum::Json(dossier)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resolution_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
    axum::Json(request): axum::Json<ResolutionIntake>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.register_resolution(DossierId(dossier_id), request) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartEvaluationRequest {
    pub(crate) years: Vec<i32>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn start_evaluation_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
    axum::Json(request): axum::Json<StartEvaluationRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    match service.start_evaluation(DossierId(dossier_id), request.years, today) {
        Ok(evaluation) => (StatusCode::CREATED, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn close_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.close_dossier(DossierId(dossier_id), Local::now().naive_local()) {
        Ok(dossier) => (StatusCode::OK, axum::Json(dossier)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn committee_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
    axum::Json(request): axum::Json<CommitteeIntake>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.upsert_committee(DossierId(dossier_id), request) {
        Ok(committee) => (StatusCode::OK, axum::Json(committee)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reminder_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = Local::now().date_naive();
    match service.remind_pending(DossierId(dossier_id), today) {
        Ok(outcome) => (StatusCode::ACCEPTED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bundle_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.bundle(DossierId(dossier_id)) {
        Ok(bundle) => download(GeneratedDocument {
            filename: bundle.filename,
            content_type: bundle.content_type,
            bytes: bundle.bytes,
        }),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn jury_sheet_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(dossier_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.jury_sheet(DossierId(dossier_id)) {
        Ok(document) => download(document),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleRequest {
    #[serde(default)]
    pub(crate) scheduled_at: Option<NaiveDateTime>,
}

pub(crate) async fn schedule_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(evaluation_id): Path<u64>,
    axum::Json(request): axum::Json<ScheduleRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.schedule_evaluation(EvaluationId(evaluation_id), request.scheduled_at) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn notify_committee_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.notify_committee(EvaluationId(evaluation_id)) {
        Ok(outcome) => (StatusCode::ACCEPTED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitFormRequest {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) async fn submit_form_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(form_id): Path<u64>,
    axum::Json(request): axum::Json<SubmitFormRequest>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let file = StoredFile {
        filename: request.filename,
        content_type: request.content_type,
        bytes: request.bytes,
    };
    match service.submit_form(FormId(form_id), file, today) {
        Ok(form) => (StatusCode::OK, axum::Json(FormView::from_form(&form))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn form_template_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Path(form_id): Path<u64>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    let today = Local::now().date_naive();
    match service.form_template(FormId(form_id), today) {
        Ok(document) => download(document),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn faculty_picker_handler<D, S, M>(
    State(service): State<Arc<DossierService<D, S, M>>>,
    Query(filter): Query<FacultyFilter>,
) -> Response
where
    D: DirectoryStore + 'static,
    S: DossierStore + 'static,
    M: MailTransport + 'static,
{
    match service.directory().eligible_faculty(filter) {
        Ok(entries) => {
            (StatusCode::OK, axum::Json(json!({ "faculty": entries }))).into_response()
        }
        Err(DirectoryServiceError::Repository(err)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
