use bytes::BytesMut;
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::config::Config;
use crate::runtime::data_dir::{container_name, prepare_data_dir};
use crate::runtime::demux::{decode_batch, LogStream};
use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::RuntimeInterface;
use crate::runtime::stats::ContainerStats;
use crate::runtime::status::{detailed_status, resolve_status, unreachable_status, DetailedStatus};
use crate::runtime::types::{
    ContainerSnapshot, ContainerSpec, InstanceConfig, InstanceStatus, ManagedContainer, LABEL_INSTANCE_ID, LABEL_MANAGED, LABEL_OWNER,
};

/// Fixed settings every instance container is created with.
#[derive(Debug, Clone)]
pub(crate) struct InstanceTemplate {
    pub(crate) image: String,
    pub(crate) data_root: PathBuf,
    pub(crate) mount_path: String,
    pub(crate) memory_bytes: i64,
    pub(crate) nano_cpus: i64,
    pub(crate) dns: Vec<String>,
}

impl InstanceTemplate {
    pub(crate) fn from_config(config: &Config) -> InstanceTemplate {
        InstanceTemplate {
            image: config.images.instance.clone(),
            data_root: PathBuf::from(&config.instances.data_root),
            mount_path: config.instances.mount_path.clone(),
            memory_bytes: config.instances.memory_bytes(),
            nano_cpus: config.instances.nano_cpus(),
            dns: config.instances.dns.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CreatedInstance {
    pub(crate) container_id: String,
    pub(crate) container_name: String,
    pub(crate) data_dir: PathBuf,
}

fn not_found_is_ok(result: Result<(), RuntimeError>) -> Result<(), RuntimeError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

pub(crate) struct InstanceManager {
    runtime: Arc<dyn RuntimeInterface>,
    template: InstanceTemplate,
}

impl InstanceManager {
    pub(crate) fn new(runtime: Arc<dyn RuntimeInterface>, template: InstanceTemplate) -> InstanceManager {
        InstanceManager { runtime, template }
    }

    fn container_spec(&self, config: &InstanceConfig, name: &str, host_path: &str) -> ContainerSpec {
        let mut env: Vec<String> = config.secrets
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();

        if let Some(model) = &config.model_name {
            env.push(format!("MODEL_NAME={}", model));
        }
        env.push(format!("BOTYARD_INSTANCE_ID={}", config.instance_id));
        env.push(format!("BOTYARD_OWNER={}", config.owner_identity));

        let labels = HashMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_INSTANCE_ID.to_string(), config.instance_id.clone()),
            (LABEL_OWNER.to_string(), config.owner_identity.clone()),
        ]);

        ContainerSpec {
            name: name.to_string(),
            image: self.template.image.clone(),
            env,
            labels,
            host_path: host_path.to_string(),
            mount_path: self.template.mount_path.clone(),
            memory_bytes: self.template.memory_bytes,
            nano_cpus: self.template.nano_cpus,
            dns: self.template.dns.clone(),
        }
    }

    /// Stop then force-remove, treating an absent container as done.
    async fn discard(&self, container: &str) -> Result<(), RuntimeError> {
        if let Err(e) = self.runtime.stop_container(container).await {
            if !e.is_not_found() {
                debug!("Stopping {} before removal failed: {}", container, e);
            }
        }

        not_found_is_ok(self.runtime.remove_container(container).await)
    }

    /// (Re)creates the owner's container and starts it.
    ///
    /// Any container already holding the owner's name is replaced, so calling
    /// this twice leaves exactly one container. The data directory is reused.
    pub(crate) async fn create_instance(&self, config: &InstanceConfig) -> Result<CreatedInstance, RuntimeError> {
        let prepared = prepare_data_dir(&self.template.data_root, &config.owner_identity)?;
        if prepared.is_degraded() {
            warn!(
                "Data directory {} prepared with {} permission warning(s)",
                prepared.path.display(),
                prepared.permission_warnings.len()
            );
        }

        let name = container_name(&config.owner_identity)?;
        self.discard(&name).await?;

        let spec = self.container_spec(config, &name, &prepared.path.to_string_lossy());
        let container_id = self.runtime.create_container(&spec).await.map_err(|e| match e {
            RuntimeError::DaemonUnreachable(_) => e,
            other => RuntimeError::InstanceCreationFailed(format!("Cannot create container {}: {}", name, other)),
        })?;

        self.runtime.start_container(&container_id).await?;

        info!("Instance {} runs in container {} ({})", config.instance_id, name, container_id);

        Ok(CreatedInstance {
            container_id,
            container_name: name,
            data_dir: prepared.path,
        })
    }

    pub(crate) async fn start_instance(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.runtime.start_container(container_id).await
    }

    pub(crate) async fn stop_instance(&self, container_id: &str) -> Result<(), RuntimeError> {
        not_found_is_ok(self.runtime.stop_container(container_id).await)
    }

    pub(crate) async fn restart_instance(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.runtime.restart_container(container_id).await
    }

    /// Removes the container. The owner's data directory stays on disk.
    pub(crate) async fn delete_instance(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.discard(container_id).await
    }

    /// Raw runtime state, with inspection failures surfaced.
    pub(crate) async fn inspect(&self, container_id: &str) -> Result<ContainerSnapshot, RuntimeError> {
        self.runtime.inspect_container(container_id).await
    }

    pub(crate) async fn get_status(&self, container_id: &str) -> InstanceStatus {
        match self.inspect(container_id).await {
            Ok(snapshot) => resolve_status(&snapshot),
            Err(e) => {
                debug!("Cannot inspect {}: {}", container_id, e);
                InstanceStatus::Error
            }
        }
    }

    pub(crate) async fn get_detailed_status(&self, container_id: &str) -> DetailedStatus {
        match self.runtime.inspect_container(container_id).await {
            Ok(snapshot) => detailed_status(&snapshot),
            Err(e) => {
                debug!("Cannot inspect {}: {}", container_id, e);
                unreachable_status()
            }
        }
    }

    pub(crate) async fn get_logs(&self, container_id: &str, tail: Option<u32>) -> Result<String, RuntimeError> {
        let mut stream = self.runtime.raw_logs(container_id, tail, false).await?;
        let mut buffer = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        Ok(decode_batch(&buffer))
    }

    pub(crate) async fn stream_logs(&self, container_id: &str, tail: Option<u32>) -> Result<LogStream, RuntimeError> {
        let source = self.runtime.raw_logs(container_id, tail, true).await?;
        Ok(LogStream::new(source))
    }

    pub(crate) async fn get_container_stats(&self, container_id: &str) -> Result<ContainerStats, RuntimeError> {
        let raw = self.runtime.stats(container_id).await?;
        Ok(ContainerStats::from_raw(&raw))
    }

    pub(crate) async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeError> {
        self.runtime.list_managed_containers().await
    }
}

#[cfg(test)]
pub(crate) fn test_template(data_root: &std::path::Path) -> InstanceTemplate {
    InstanceTemplate {
        image: "botyard-instance:latest".to_string(),
        data_root: data_root.to_path_buf(),
        mount_path: "/data".to_string(),
        memory_bytes: 2 * 1024 * 1024 * 1024,
        nano_cpus: 1_000_000_000,
        dns: vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()],
    }
}

#[cfg(test)]
pub(crate) fn instance_config(instance_id: &str, owner: &str) -> InstanceConfig {
    InstanceConfig {
        instance_id: instance_id.to_string(),
        owner_identity: owner.to_string(),
        secrets: [("EXCHANGE_API_KEY".to_string(), "k-123".to_string())].into_iter().collect(),
        model_name: Some("claude-sonnet".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::demux::encode_frame;
    use crate::runtime::fake::FakeRuntime;
    use crate::runtime::types::{ContainerSnapshot, RawStats};
    use std::fs;
    use tempdir::TempDir;

    fn manager(runtime: Arc<FakeRuntime>, root: &TempDir) -> InstanceManager {
        InstanceManager::new(runtime, test_template(root.path()))
    }

    #[tokio::test]
    async fn test_create_instance_binds_data_dir_and_labels() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);

        let created = manager.create_instance(&instance_config("inst-1", "tg-1001")).await.unwrap();

        assert_eq!(created.container_name, "botyard-tg-1001");
        let container = runtime.container(&created.container_id).unwrap();
        assert!(container.snapshot.running);
        assert_eq!(container.spec.host_path, root.path().join("tg-1001").to_string_lossy());
        assert_eq!(container.spec.mount_path, "/data");
        assert_eq!(container.spec.labels.get(LABEL_MANAGED).unwrap(), "true");
        assert_eq!(container.spec.labels.get(LABEL_INSTANCE_ID).unwrap(), "inst-1");
        assert!(container.spec.env.contains(&"EXCHANGE_API_KEY=k-123".to_string()));
        assert!(container.spec.env.contains(&"MODEL_NAME=claude-sonnet".to_string()));
    }

    #[tokio::test]
    async fn test_create_twice_keeps_one_container_and_the_data() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);
        let config = instance_config("inst-1", "tg-1001");

        let first = manager.create_instance(&config).await.unwrap();
        fs::write(first.data_dir.join("workspace/strategy.md"), "buy low").unwrap();

        let second = manager.create_instance(&config).await.unwrap();

        assert_ne!(first.container_id, second.container_id);
        assert_eq!(runtime.container_count(), 1);
        assert!(runtime.container("botyard-tg-1001").unwrap().snapshot.running);
        assert_eq!(fs::read_to_string(second.data_dir.join("workspace/strategy.md")).unwrap(), "buy low");
    }

    #[tokio::test]
    async fn test_similar_owners_stay_isolated() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);

        let alice = manager.create_instance(&instance_config("inst-1", "alice@example.com")).await.unwrap();
        fs::write(alice.data_dir.join("credentials/wallet.json"), "alice-key").unwrap();

        let other = manager.create_instance(&instance_config("inst-2", "alice-example.com")).await.unwrap();

        assert_ne!(alice.container_name, other.container_name);
        assert_ne!(alice.data_dir, other.data_dir);
        assert_eq!(runtime.container_count(), 2);
        assert!(runtime.container(&alice.container_id).unwrap().snapshot.running);
        assert!(!other.data_dir.join("credentials/wallet.json").exists());
    }

    #[tokio::test]
    async fn test_create_failure_is_reported() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        runtime.state.lock().unwrap().failing_creates.insert("botyard-tg-1001".to_string());
        let manager = manager(runtime.clone(), &root);

        let result = manager.create_instance(&instance_config("inst-1", "tg-1001")).await;
        assert!(matches!(result, Err(RuntimeError::InstanceCreationFailed(_))));
    }

    #[tokio::test]
    async fn test_delete_keeps_the_data_directory() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);

        let created = manager.create_instance(&instance_config("inst-1", "tg-1001")).await.unwrap();
        fs::write(created.data_dir.join("credentials/wallet.json"), "{}").unwrap();

        manager.delete_instance(&created.container_id).await.unwrap();

        assert_eq!(runtime.container_count(), 0);
        assert!(created.data_dir.join("credentials/wallet.json").exists());
    }

    #[tokio::test]
    async fn test_stop_and_delete_ignore_missing_containers() {
        let root = TempDir::new("botyard").unwrap();
        let manager = manager(Arc::new(FakeRuntime::new()), &root);

        assert!(manager.stop_instance("gone").await.is_ok());
        assert!(manager.delete_instance("gone").await.is_ok());
        assert!(manager.restart_instance("gone").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_status_follows_the_snapshot() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);
        let id = runtime.seed_container("botyard-tg-1001", "inst-1", true);

        assert_eq!(manager.get_status(&id).await, InstanceStatus::Running);

        runtime.set_snapshot(&id, ContainerSnapshot {
            running: true,
            has_healthcheck: true,
            health: Some("starting".to_string()),
            ..Default::default()
        });
        assert_eq!(manager.get_status(&id).await, InstanceStatus::Pending);

        manager.stop_instance(&id).await.unwrap();
        assert_eq!(manager.get_status(&id).await, InstanceStatus::Stopped);
    }

    #[tokio::test]
    async fn test_status_of_missing_container_is_error() {
        let root = TempDir::new("botyard").unwrap();
        let manager = manager(Arc::new(FakeRuntime::new()), &root);

        assert_eq!(manager.get_status("gone").await, InstanceStatus::Error);
        let detailed = manager.get_detailed_status("gone").await;
        assert_eq!(detailed.state, InstanceStatus::Error);
        assert_eq!(detailed.exit_code, -1);
    }

    #[tokio::test]
    async fn test_get_logs_decodes_frames() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);
        let id = runtime.seed_container("botyard-tg-1001", "inst-1", true);

        let mut bytes = encode_frame(1, b"agent booted\n");
        bytes.extend(encode_frame(2, b"rpc timeout, retrying\n"));
        runtime.state.lock().unwrap().logs.insert(id.clone(), bytes);

        let logs = manager.get_logs(&id, Some(100)).await.unwrap();
        assert_eq!(logs, "agent booted\nrpc timeout, retrying\n");
    }

    #[tokio::test]
    async fn test_stream_logs_yields_lines() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);
        let id = runtime.seed_container("botyard-tg-1001", "inst-1", true);
        runtime.state.lock().unwrap().logs.insert(id.clone(), encode_frame(1, b"tick 1\ntick 2\n"));

        let lines: Vec<String> = manager.stream_logs(&id, None).await.unwrap()
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["tick 1", "tick 2"]);
    }

    #[tokio::test]
    async fn test_container_stats() {
        let root = TempDir::new("botyard").unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let manager = manager(runtime.clone(), &root);
        let id = runtime.seed_container("botyard-tg-1001", "inst-1", true);
        runtime.state.lock().unwrap().stats = RawStats {
            memory_usage: 256 * 1024 * 1024,
            memory_limit: 1024 * 1024 * 1024,
            pids: 3,
            ..Default::default()
        };

        let stats = manager.get_container_stats(&id).await.unwrap();
        assert_eq!(stats.memory_percent, 25.0);
        assert_eq!(stats.pids, 3);
    }
}
