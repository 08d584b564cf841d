use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json
};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

pub(crate) async fn deploy(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    let created = orchestrator.deploy(&id).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
