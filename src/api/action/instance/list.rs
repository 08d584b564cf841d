use axum::{extract::State, response::IntoResponse, Json};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;
use crate::models::instances;

pub(crate) async fn list(State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    let instances = instances::find_all(&orchestrator.pool).await?;

    Ok(Json(instances))
}
