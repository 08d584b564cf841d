use axum::{extract::State, response::IntoResponse, Json};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

pub(crate) async fn list(State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    let containers = orchestrator.manager.list_managed_containers().await?;

    Ok(Json(containers))
}
