use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

use crate::runtime::error::RuntimeError;
use crate::runtime::types::{ContainerSnapshot, ContainerSpec, ManagedContainer, RawStats};

pub(crate) type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RuntimeError>> + Send>>;

/// Container side of the daemon.
#[async_trait]
pub(crate) trait RuntimeInterface: Send + Sync {
    async fn ping(&self) -> Result<(), RuntimeError>;
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;
    async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError>;
    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError>;
    async fn restart_container(&self, container_id: &str) -> Result<(), RuntimeError>;
    /// Force removal, the container may still be running.
    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError>;
    async fn inspect_container(&self, container_id: &str) -> Result<ContainerSnapshot, RuntimeError>;
    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeError>;
    /// Undecoded multiplexed log bytes, as the daemon sends them.
    async fn raw_logs(&self, container_id: &str, tail: Option<u32>, follow: bool) -> Result<ByteStream, RuntimeError>;
    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BuildRequest {
    pub(crate) tag: String,
    pub(crate) dockerfile: String,
    pub(crate) context: String,
    pub(crate) no_cache: bool,
    pub(crate) build_args: Vec<(String, String)>,
}

/// Image side of the daemon.
#[async_trait]
pub(crate) trait ImageBackend: Send + Sync {
    async fn check_connectivity(&self) -> Result<(), RuntimeError>;
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;
    async fn build_image(&self, request: &BuildRequest) -> Result<(), RuntimeError>;
}
