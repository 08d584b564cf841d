use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json
};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

pub(crate) async fn stats(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    let stats = orchestrator.manager.get_container_stats(&id).await?;

    Ok(Json(stats))
}
