use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::workflows::directory::{
    CourseId, DirectoryStore, FacultyId, RepositoryError, StoredFile,
};
use crate::workflows::dossier::documents::MailTransport;

use super::domain::{ItemId, RequestId};
use super::repository::EquivalenceStore;
use super::service::{
    CreateRequest, EquivalenceService, EquivalenceServiceError, RulingIntake,
};

/// Router builder exposing the equivalence workflow endpoints.
pub fn equivalence_router<E, D, M>(service: Arc<EquivalenceService<E, D, M>>) -> Router
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route(
            "/api/v1/equivalences",
            get(dashboard_handler::<E, D, M>).post(create_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/stats",
            get(statistics_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/:request_id",
            get(detail_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/:request_id/resend",
            post(resend_pending_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/:request_id/finalize",
            post(finalize_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/items/:item_id/ruling",
            post(ruling_handler::<E, D, M>),
        )
        .route(
            "/api/v1/equivalences/items/:item_id/resend",
            post(resend_item_handler::<E, D, M>),
        )
        .route(
            "/api/v1/courses/:course_id/responsible",
            post(responsible_handler::<E, D, M>),
        )
        .with_state(service)
}

fn error_response(error: EquivalenceServiceError) -> Response {
    let status = match &error {
        EquivalenceServiceError::MissingStudent
        | EquivalenceServiceError::NoCoursesSelected
        | EquivalenceServiceError::NoResponsible(_)
        | EquivalenceServiceError::MissingPrimaryEmail(_)
        | EquivalenceServiceError::IneligibleResponsible
        | EquivalenceServiceError::NothingToSend(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EquivalenceServiceError::StudentNotFound
        | EquivalenceServiceError::RequestNotFound
        | EquivalenceServiceError::ItemNotFound
        | EquivalenceServiceError::CourseNotFound => StatusCode::NOT_FOUND,
        EquivalenceServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        EquivalenceServiceError::Mail(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn create_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    axum::Json(request): axum::Json<CreateRequest>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.create_request(request, Local::now().naive_local()) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DashboardRequest {
    #[serde(default)]
    pub(crate) search: Option<String>,
}

pub(crate) async fn dashboard_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Query(request): Query<DashboardRequest>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.dashboard(request.search.as_deref()) {
        Ok(rows) => (StatusCode::OK, axum::Json(json!({ "requests": rows }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(request_id): Path<u64>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.detail(RequestId(request_id)) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ruling_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(item_id): Path<u64>,
    axum::Json(request): axum::Json<RulingIntake>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.record_ruling(ItemId(item_id), request, Local::now().naive_local()) {
        Ok(item) => (StatusCode::OK, axum::Json(item)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resend_item_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(item_id): Path<u64>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.resend_item(ItemId(item_id)) {
        Ok(()) => (StatusCode::ACCEPTED, axum::Json(json!({ "resent": true }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resend_pending_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(request_id): Path<u64>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.resend_pending(RequestId(request_id)) {
        Ok(outcome) => (StatusCode::ACCEPTED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinalizeRequest {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) async fn finalize_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(request_id): Path<u64>,
    axum::Json(request): axum::Json<FinalizeRequest>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    let signed_act = StoredFile {
        filename: request.filename,
        content_type: request.content_type,
        bytes: request.bytes,
    };
    match service.finalize(RequestId(request_id), signed_act, Local::now().naive_local()) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatisticsRequest {
    #[serde(default)]
    pub(crate) year: Option<i32>,
}

pub(crate) async fn statistics_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Query(request): Query<StatisticsRequest>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.statistics(request.year) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsibleRequest {
    pub(crate) faculty: u64,
}

pub(crate) async fn responsible_handler<E, D, M>(
    State(service): State<Arc<EquivalenceService<E, D, M>>>,
    Path(course_id): Path<u64>,
    axum::Json(request): axum::Json<ResponsibleRequest>,
) -> Response
where
    E: EquivalenceStore + 'static,
    D: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    match service.assign_responsible(CourseId(course_id), FacultyId(request.faculty)) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Err(error) => error_response(error),
    }
}
