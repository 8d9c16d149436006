use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{EvaluationConfig, FocusArea, FocusAreaId, FocusAreaSelection, ProgramId};
use super::repository::{FocusAreaStore, StoreError};

/// Router exposing the portal's focus area endpoints over a store.
///
/// `/api/programs/focusAreas/:id` is a program id for GET and PUT and a focus area id for
/// DELETE, mirroring the portal's paths.
pub fn focus_area_router<S>(store: Arc<S>) -> Router
where
    S: FocusAreaStore + 'static,
{
    Router::new()
        .route("/api/programs/focusAreas", post(save_handler::<S>))
        .route(
            "/api/programs/focusAreas/:id",
            get(list_handler::<S>)
                .put(selection_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/api/programs/focusAreas/:id/eval",
            put(evaluation_handler::<S>),
        )
        .route("/api/programs/:program_id", get(program_handler::<S>))
        .with_state(store)
}

fn error_response(error: StoreError) -> Response {
    let status = match &error {
        StoreError::ProgramNotFound(_) | StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidParent(_)
        | StoreError::Invalid(_)
        | StoreError::InvalidEvaluation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(%error, "focus area store failure");
    }

    let payload = match &error {
        StoreError::InvalidEvaluation(fields) => json!({
            "error": error.to_string(),
            "fields": fields,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, Json(payload)).into_response()
}

pub(crate) async fn list_handler<S>(
    State(store): State<Arc<S>>,
    Path(program_id): Path<String>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    match store.list(&ProgramId(program_id)) {
        Ok(areas) => (StatusCode::OK, Json(areas)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn program_handler<S>(
    State(store): State<Arc<S>>,
    Path(program_id): Path<String>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    match store.program(&ProgramId(program_id)) {
        Ok(program) => (StatusCode::OK, Json(program)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_handler<S>(
    State(store): State<Arc<S>>,
    Json(area): Json<FocusArea>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    let creating = area.id.is_none();
    match store.save(area) {
        Ok(saved) => {
            info!(id = ?saved.id, creating, "focus area stored");
            let status = if creating {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(saved)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S>(
    State(store): State<Arc<S>>,
    Path(area_id): Path<String>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    let id = FocusAreaId(area_id);
    match store.delete(&id) {
        Ok(remaining) => {
            info!(%id, "focus area removed");
            (StatusCode::OK, Json(remaining)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn selection_handler<S>(
    State(store): State<Arc<S>>,
    Path(program_id): Path<String>,
    Json(selection): Json<FocusAreaSelection>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    match store.set_selection(&ProgramId(program_id), &selection.focus_area_ids) {
        Ok(selected) => (StatusCode::OK, Json(selected)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluation_handler<S>(
    State(store): State<Arc<S>>,
    Path(focus_area_id): Path<String>,
    Json(config): Json<EvaluationConfig>,
) -> Response
where
    S: FocusAreaStore + 'static,
{
    match store.update_evaluation(&FocusAreaId(focus_area_id), config) {
        Ok(saved) => (StatusCode::OK, Json(saved)).into_response(),
        Err(error) => error_response(error),
    }
}
