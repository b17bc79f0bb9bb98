use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::completion::DocumentAnswers;
use super::repository::{RepositoryError, SessionRepository};
use super::requirements::{ConditionFlags, ResolveError};
use super::scoring::Answer;
use super::service::{SelectionUpdate, WizardError, WizardService};
use super::session::SessionId;
use crate::catalog::{DocumentId, Frame, ProgramId};

#[derive(Debug, Deserialize)]
pub(crate) struct MatchRequest {
    #[serde(default)]
    pub(crate) answers: Vec<Answer>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RequirementsRequest {
    #[serde(default)]
    pub(crate) frame: Frame,
    #[serde(default)]
    pub(crate) conditions: ConditionFlags,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentAnswersRequest {
    pub(crate) answers: DocumentAnswers,
}

type SharedService<R> = Arc<WizardService<R>>;

/// Router builder exposing the wizard's catalog, scoring, and session endpoints.
pub fn wizard_router<R>(service: SharedService<R>) -> Router
where
    R: SessionRepository + 'static,
{
    Router::new()
        .route("/api/v1/questions", get(questions_handler::<R>))
        .route("/api/v1/matches", post(matches_handler::<R>))
        .route("/api/v1/programs", get(programs_handler::<R>))
        .route("/api/v1/programs/:program", get(program_handler::<R>))
        .route(
            "/api/v1/programs/:program/requirements",
            post(requirements_handler::<R>),
        )
        .route("/api/v1/sessions", post(start_session_handler::<R>))
        .route("/api/v1/sessions/:session_id", get(session_handler::<R>))
        .route(
            "/api/v1/sessions/:session_id/answers",
            post(answer_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/matches",
            get(session_matches_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/selection",
            put(selection_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/requirements",
            get(session_requirements_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/documents/:document_id",
            put(document_answers_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/progress",
            get(progress_handler::<R>),
        )
        .route(
            "/api/v1/sessions/:session_id/export.csv",
            get(export_handler::<R>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: WizardError) -> Response {
    let status = match &error {
        WizardError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WizardError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        WizardError::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        WizardError::Resolve(ResolveError::UnknownProgram(_)) => StatusCode::NOT_FOUND,
        WizardError::ProgramNotSelected => StatusCode::CONFLICT,
        WizardError::UnknownQuestion(_)
        | WizardError::InvalidOption { .. }
        | WizardError::UnknownFrame { .. }
        | WizardError::UnknownDocument(_)
        | WizardError::UnknownTemplateQuestion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WizardError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!(%error, "wizard request failed");
    }

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, WizardError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn questions_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    (StatusCode::OK, Json(service.question_set())).into_response()
}

pub(crate) async fn matches_handler<R>(
    State(service): State<SharedService<R>>,
    Json(request): Json<MatchRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let matches = service.score(&request.answers);
    (StatusCode::OK, Json(json!({ "matches": matches }))).into_response()
}

pub(crate) async fn programs_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    let programs = service.catalog().programs().to_vec();
    (StatusCode::OK, Json(json!({ "programs": programs }))).into_response()
}

pub(crate) async fn program_handler<R>(
    State(service): State<SharedService<R>>,
    Path(program): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    respond(StatusCode::OK, service.program_detail(&ProgramId(program)))
}

pub(crate) async fn requirements_handler<R>(
    State(service): State<SharedService<R>>,
    Path(program): Path<String>,
    Json(request): Json<RequirementsRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.resolve(&ProgramId(program), &request.frame, &request.conditions),
    )
}

pub(crate) async fn start_session_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service.start().map(|session| service.view(&session));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn session_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .get(&SessionId(session_id))
        .map(|session| service.view(&session));
    respond(StatusCode::OK, result)
}

pub(crate) async fn answer_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    Json(answer): Json<Answer>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .record_answer(&SessionId(session_id), answer)
        .map(|session| service.view(&session));
    respond(StatusCode::OK, result)
}

pub(crate) async fn session_matches_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .matches(&SessionId(session_id))
        .map(|matches| json!({ "matches": matches }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn selection_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
    Json(update): Json<SelectionUpdate>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .apply_selection(&SessionId(session_id), update)
        .map(|session| service.view(&session));
    respond(StatusCode::OK, result)
}

pub(crate) async fn session_requirements_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let result = service
        .requirements(&SessionId(session_id))
        .map(|documents| json!({ "documents": documents }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn document_answers_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, document_id)): Path<(String, String)>,
    Json(request): Json<DocumentAnswersRequest>,
) -> Response
where
    R: SessionRepository + 'static,
{
    let id = SessionId(session_id);
    let result = service
        .fill_answers(&id, DocumentId(document_id), request.answers)
        .and_then(|_| service.progress(&id));
    respond(StatusCode::OK, result)
}

pub(crate) async fn progress_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    respond(StatusCode::OK, service.progress(&SessionId(session_id)))
}

pub(crate) async fn export_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
{
    match service.export_csv(&SessionId(session_id.clone())) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{session_id}.csv\""),
                ),
            ],
            body,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}
