use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json
};
use serde_json::json;

use crate::api::server::SharedOrchestrator;

pub(crate) async fn status(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> impl IntoResponse {
    let status = orchestrator.manager.get_status(&id).await;

    Json(json!({ "container_id": id, "status": status }))
}

/// Never fails: an unknown container or an unreachable daemon reads as `error`.
pub(crate) async fn detailed_status(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> impl IntoResponse {
    Json(orchestrator.manager.get_detailed_status(&id).await)
}
