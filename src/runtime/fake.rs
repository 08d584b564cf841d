use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::{BuildRequest, ByteStream, ImageBackend, RuntimeInterface};
use crate::runtime::types::{ContainerSnapshot, ContainerSpec, ManagedContainer, RawStats, LABEL_INSTANCE_ID, LABEL_MANAGED};

#[derive(Debug, Clone)]
pub(crate) struct FakeContainer {
    pub(crate) spec: ContainerSpec,
    pub(crate) snapshot: ContainerSnapshot,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) containers: BTreeMap<String, FakeContainer>,
    pub(crate) next_id: u64,
    pub(crate) images: HashSet<String>,
    pub(crate) builds: Vec<BuildRequest>,
    pub(crate) failing_builds: HashSet<String>,
    pub(crate) build_delay: Duration,
    pub(crate) logs: HashMap<String, Vec<u8>>,
    pub(crate) stats: RawStats,
    pub(crate) unreachable: bool,
    pub(crate) failing_creates: HashSet<String>,
}

/// In-memory daemon. Containers are addressable by id or by name.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    pub(crate) state: Mutex<FakeState>,
}

fn resolve(state: &FakeState, key: &str) -> Option<String> {
    if state.containers.contains_key(key) {
        return Some(key.to_string());
    }

    state.containers
        .iter()
        .find(|(_, container)| container.spec.name == key)
        .map(|(id, _)| id.clone())
}

impl FakeRuntime {
    pub(crate) fn new() -> FakeRuntime {
        FakeRuntime::default()
    }

    pub(crate) fn with_images(images: &[&str]) -> FakeRuntime {
        let runtime = FakeRuntime::default();
        runtime.state.lock().unwrap().images = images.iter().map(|i| i.to_string()).collect();
        runtime
    }

    /// Registers a managed container as if an earlier process had created it.
    pub(crate) fn seed_container(&self, name: &str, instance_id: &str, running: bool) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("fake-{:04}", state.next_id);

        let labels = HashMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_INSTANCE_ID.to_string(), instance_id.to_string()),
        ]);

        state.containers.insert(id.clone(), FakeContainer {
            spec: ContainerSpec {
                name: name.to_string(),
                image: "botyard-instance:old".to_string(),
                env: vec![],
                labels,
                host_path: String::new(),
                mount_path: "/data".to_string(),
                memory_bytes: 0,
                nano_cpus: 0,
                dns: vec![],
            },
            snapshot: ContainerSnapshot { running, ..Default::default() },
        });

        id
    }

    pub(crate) fn set_snapshot(&self, container_id: &str, snapshot: ContainerSnapshot) {
        let mut state = self.state.lock().unwrap();
        if let Some(container) = state.containers.get_mut(container_id) {
            container.snapshot = snapshot;
        }
    }

    /// Drops a container behind the manager's back.
    pub(crate) fn remove_now(&self, container_id: &str) {
        self.state.lock().unwrap().containers.remove(container_id);
    }

    pub(crate) fn container(&self, key: &str) -> Option<FakeContainer> {
        let state = self.state.lock().unwrap();
        resolve(&state, key).and_then(|id| state.containers.get(&id).cloned())
    }

    pub(crate) fn container_count(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }

    pub(crate) fn builds(&self) -> Vec<BuildRequest> {
        self.state.lock().unwrap().builds.clone()
    }

    fn check_reachable(&self) -> Result<(), RuntimeError> {
        if self.state.lock().unwrap().unreachable {
            return Err(RuntimeError::DaemonUnreachable("fake daemon is down".to_string()));
        }
        Ok(())
    }

    fn with_container<T>(&self, key: &str, f: impl FnOnce(&mut FakeContainer) -> T) -> Result<T, RuntimeError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        let id = resolve(&state, key).ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", key)))?;
        let container = state.containers.get_mut(&id).expect("resolved container exists");
        Ok(f(container))
    }
}

#[async_trait]
impl RuntimeInterface for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.check_reachable()
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();

        if state.failing_creates.contains(&spec.name) {
            return Err(RuntimeError::Transient(format!("cannot create {}", spec.name)));
        }

        if resolve(&state, &spec.name).is_some() {
            return Err(RuntimeError::Transient(format!("Conflict. The container name \"/{}\" is already in use", spec.name)));
        }

        state.next_id += 1;
        let id = format!("fake-{:04}", state.next_id);
        state.containers.insert(id.clone(), FakeContainer {
            spec: spec.clone(),
            snapshot: ContainerSnapshot::default(),
        });

        Ok(id)
    }

    async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.with_container(container_id, |container| {
            container.snapshot.running = true;
            container.snapshot.exit_code = 0;
        })
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.with_container(container_id, |container| {
            container.snapshot.running = false;
            container.snapshot.restarting = false;
        })
    }

    async fn restart_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.with_container(container_id, |container| {
            container.snapshot.running = true;
            container.snapshot.restart_count += 1;
        })
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        let id = resolve(&state, container_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", container_id)))?;
        state.containers.remove(&id);
        Ok(())
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerSnapshot, RuntimeError> {
        self.with_container(container_id, |container| container.snapshot.clone())
    }

    async fn list_managed_containers(&self) -> Result<Vec<ManagedContainer>, RuntimeError> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();

        Ok(state.containers
            .iter()
            .filter(|(_, c)| c.spec.labels.get(LABEL_MANAGED).map(String::as_str) == Some("true"))
            .map(|(id, c)| ManagedContainer {
                id: id.clone(),
                name: c.spec.name.clone(),
                instance_id: c.spec.labels.get(LABEL_INSTANCE_ID).cloned(),
                status: if c.snapshot.running { "Up".to_string() } else { "Exited".to_string() },
                image: c.spec.image.clone(),
            })
            .collect())
    }

    async fn raw_logs(&self, container_id: &str, _tail: Option<u32>, _follow: bool) -> Result<ByteStream, RuntimeError> {
        self.with_container(container_id, |_| ())?;
        let bytes = self.state.lock().unwrap().logs.get(container_id).cloned().unwrap_or_default();
        let (a, b) = bytes.split_at(bytes.len() / 2);
        let chunks = vec![Ok(Bytes::from(a.to_vec())), Ok(Bytes::from(b.to_vec()))];
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError> {
        self.with_container(container_id, |_| ())?;
        Ok(self.state.lock().unwrap().stats.clone())
    }
}

#[async_trait]
impl ImageBackend for FakeRuntime {
    async fn check_connectivity(&self) -> Result<(), RuntimeError> {
        self.check_reachable()
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().images.contains(image))
    }

    async fn build_image(&self, request: &BuildRequest) -> Result<(), RuntimeError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.builds.push(request.clone());
            state.build_delay
        };

        tokio::time::sleep(delay).await;

        let mut state = self.state.lock().unwrap();
        if state.failing_builds.contains(&request.tag) {
            return Err(RuntimeError::BuildFailure {
                message: format!("docker build for {} exited with exit status: 1", request.tag),
                tail: vec!["#4 ERROR: process did not complete successfully".to_string()],
            });
        }

        state.images.insert(request.tag.clone());
        Ok(())
    }
}
