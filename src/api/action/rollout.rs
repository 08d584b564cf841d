use axum::{extract::State, response::IntoResponse, Json};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

/// Per-container results are returned even when some updates failed; only a
/// failed image rebuild fails the request.
pub(crate) async fn rollout(State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    let results = orchestrator.rollout().await?;

    Ok(Json(results))
}
