use futures::future::{BoxFuture, FutureExt, Shared};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::config::ImageSettings;
use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::{BuildRequest, ImageBackend};

type SharedBuild = Shared<BoxFuture<'static, Result<(), RuntimeError>>>;

enum BuildState {
    NotReady,
    Building { generation: u64, build: SharedBuild },
    Ready,
}

struct Inner {
    state: BuildState,
    generation: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct ImageSet {
    pub(crate) base: String,
    pub(crate) instance: String,
    pub(crate) context: String,
    pub(crate) base_dockerfile: String,
    pub(crate) instance_dockerfile: String,
}

impl ImageSet {
    pub(crate) fn from_settings(settings: &ImageSettings) -> ImageSet {
        ImageSet {
            base: settings.base.clone(),
            instance: settings.instance.clone(),
            context: settings.context.clone(),
            base_dockerfile: settings.base_dockerfile.clone(),
            instance_dockerfile: settings.instance_dockerfile.clone(),
        }
    }

    fn dockerfile(&self, name: &str) -> String {
        Path::new(&self.context).join(name).to_string_lossy().into_owned()
    }

    pub(crate) fn base_request(&self) -> BuildRequest {
        BuildRequest {
            tag: self.base.clone(),
            dockerfile: self.dockerfile(&self.base_dockerfile),
            context: self.context.clone(),
            no_cache: false,
            build_args: vec![],
        }
    }

    /// The instance image declares the base image as a build argument.
    pub(crate) fn instance_request(&self, no_cache: bool) -> BuildRequest {
        BuildRequest {
            tag: self.instance.clone(),
            dockerfile: self.dockerfile(&self.instance_dockerfile),
            context: self.context.clone(),
            no_cache,
            build_args: vec![("BASE_IMAGE".to_string(), self.base.clone())],
        }
    }
}

async fn build_missing(backend: Arc<dyn ImageBackend>, images: ImageSet) -> Result<(), RuntimeError> {
    backend.check_connectivity().await?;

    if !backend.image_exists(&images.base).await? {
        info!("Base image {} missing, building it", images.base);
        backend.build_image(&images.base_request()).await?;
    }

    if !backend.image_exists(&images.instance).await? {
        info!("Instance image {} missing, building it", images.instance);
        backend.build_image(&images.instance_request(false)).await?;
    }

    Ok(())
}

async fn rebuild_instance(backend: Arc<dyn ImageBackend>, images: ImageSet) -> Result<(), RuntimeError> {
    backend.check_connectivity().await?;

    if !backend.image_exists(&images.base).await? {
        info!("Base image {} missing, building it", images.base);
        backend.build_image(&images.base_request()).await?;
    }

    info!("Rebuilding instance image {} without cache", images.instance);
    backend.build_image(&images.instance_request(true)).await
}

/// Keeps the base and instance images present, with at most one build in flight.
pub(crate) struct ImageBuilder {
    backend: Arc<dyn ImageBackend>,
    images: ImageSet,
    inner: Mutex<Inner>,
}

impl ImageBuilder {
    pub(crate) fn new(backend: Arc<dyn ImageBackend>, images: ImageSet) -> ImageBuilder {
        ImageBuilder {
            backend,
            images,
            inner: Mutex::new(Inner {
                state: BuildState::NotReady,
                generation: 0,
            }),
        }
    }

    pub(crate) fn images(&self) -> &ImageSet {
        &self.images
    }

    fn begin(inner: &mut Inner, build: BoxFuture<'static, Result<(), RuntimeError>>) -> (u64, SharedBuild) {
        inner.generation += 1;
        let build = build.shared();
        inner.state = BuildState::Building {
            generation: inner.generation,
            build: build.clone(),
        };
        (inner.generation, build)
    }

    /// Awaits a build and records its outcome, unless a newer build took over.
    async fn settle(&self, generation: u64, build: SharedBuild) -> Result<(), RuntimeError> {
        let result = build.await;

        let mut inner = self.inner.lock().await;
        if let BuildState::Building { generation: current, .. } = &inner.state {
            if *current == generation {
                inner.state = match &result {
                    Ok(()) => BuildState::Ready,
                    Err(e) => {
                        error!("Image build failed: {}", e);
                        BuildState::NotReady
                    }
                };
            }
        }

        result
    }

    pub(crate) async fn ensure_images_ready(&self) -> Result<(), RuntimeError> {
        let (generation, build) = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                BuildState::Ready => return Ok(()),
                BuildState::Building { generation, build } => (*generation, build.clone()),
                BuildState::NotReady => {
                    let build = build_missing(self.backend.clone(), self.images.clone()).boxed();
                    Self::begin(&mut inner, build)
                }
            }
        };

        self.settle(generation, build).await
    }

    pub(crate) async fn force_rebuild_instance_image(&self) -> Result<(), RuntimeError> {
        loop {
            let (generation, build, is_ours) = {
                let mut inner = self.inner.lock().await;
                match &inner.state {
                    BuildState::Building { generation, build } => (*generation, build.clone(), false),
                    BuildState::NotReady | BuildState::Ready => {
                        let build = rebuild_instance(self.backend.clone(), self.images.clone()).boxed();
                        let (generation, build) = Self::begin(&mut inner, build);
                        (generation, build, true)
                    }
                }
            };

            if is_ours {
                return self.settle(generation, build).await;
            }

            debug!("Waiting for the in-flight image build before rebuilding");
            let _ = self.settle(generation, build).await;
        }
    }
}
