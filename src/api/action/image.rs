use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;

/// Builds whichever of the two images is missing.
pub(crate) async fn ensure(State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    orchestrator.builder.ensure_images_ready().await?;
    let images = orchestrator.builder.images();

    Ok(Json(json!({ "base": images.base, "instance": images.instance })))
}

/// Rebuilds the instance image without cache. Running containers keep the old
/// image until they are rolled out.
pub(crate) async fn rebuild(State(orchestrator): State<SharedOrchestrator>) -> Result<impl IntoResponse, ApiError> {
    orchestrator.builder.force_rebuild_instance_image().await?;

    Ok(StatusCode::NO_CONTENT)
}
