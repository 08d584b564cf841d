use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json
};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;
use crate::models::instances;

pub(crate) async fn get(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    match instances::find(&orchestrator.pool, &id).await? {
        Some(instance) => Ok(Json(instance)),
        None => Err(ApiError::not_found(format!("Instance {} not found", id))),
    }
}
