//! Container engine abstraction
//!
//! The pipeline talks to the container engine only through [`ContainerEngine`].
//! [`DockerEngine`] is the production implementation over the Docker API;
//! [`MockEngine`] scripts engine behaviour for tests.

pub mod docker;
pub mod image;
pub mod mock;

pub use docker::DockerEngine;
pub use image::{ensure_image, ImageRef};
pub use mock::{EngineCall, MockEngine};

use crate::volumes::VolumeMapping;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use indexmap::IndexMap;
use thiserror::Error;

/// Everything needed to create one phase container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub mounts: VolumeMapping,
    pub environment: IndexMap<String, String>,
}

impl ContainerSpec {
    pub fn new(
        image: impl Into<String>,
        command: Vec<String>,
        mounts: VolumeMapping,
        environment: IndexMap<String, String>,
    ) -> Self {
        Self {
            image: image.into(),
            command,
            mounts,
            environment,
        }
    }

    /// Environment in the engine's `NAME=value` notation.
    pub fn env_pairs(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }
}

/// A freshly created container and whatever the engine warned about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedContainer {
    pub id: String,
    pub warnings: Vec<String>,
}

/// A locally available image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: String,
    pub tags: Vec<String>,
    pub digests: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Container engine error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Container {0} did not report an exit status")]
    NoExitStatus(String),

    #[error("Failed to pull image {image}: {message}")]
    Pull { image: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// The subset of a container engine the pipeline relies on.
///
/// Bind mounts travel with [`ContainerSpec`] and are applied when the
/// container is created; `start_container` starts it as configured.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<CreatedContainer, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Live output of a running container. The stream ends when the container
    /// exits and cannot be restarted.
    fn stream_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<String, EngineError>>;

    /// Everything the container has written so far.
    async fn fetch_logs(&self, id: &str) -> Result<String, EngineError>;

    /// Blocks until the container exits and returns its exit code.
    async fn wait_container(&self, id: &str) -> Result<i64, EngineError>;

    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    async fn pull_image(&self, image: &ImageRef) -> Result<(), EngineError>;

    /// Local images whose repository matches `repository`.
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageInfo>, EngineError>;
}
