use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::api::error::ApiError;
use crate::api::server::SharedOrchestrator;
use crate::models::instances;
use crate::runtime::types::InstanceStatus;

pub(crate) async fn start(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<StatusCode, ApiError> {
    orchestrator.manager.start_instance(&id).await?;

    if let Some(instance) = instances::find_by_container(&orchestrator.pool, &id).await? {
        instances::update_status(&orchestrator.pool, &instance.id, InstanceStatus::Pending).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn stop(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<StatusCode, ApiError> {
    orchestrator.manager.stop_instance(&id).await?;

    if let Some(instance) = instances::find_by_container(&orchestrator.pool, &id).await? {
        instances::mark_stopped(&orchestrator.pool, &instance.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn restart(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<StatusCode, ApiError> {
    orchestrator.manager.restart_instance(&id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Removes the container only; the owner's data directory is kept.
pub(crate) async fn delete(Path(id): Path<String>, State(orchestrator): State<SharedOrchestrator>) -> Result<StatusCode, ApiError> {
    let _guard = orchestrator.exclusive().await;
    orchestrator.manager.delete_instance(&id).await?;

    if let Some(instance) = instances::find_by_container(&orchestrator.pool, &id).await? {
        instances::update_status(&orchestrator.pool, &instance.id, InstanceStatus::Stopped).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
