use super::{ContainerEngine, ContainerSpec, CreatedContainer, EngineError, ImageInfo, ImageRef};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One call made against a [`MockEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    CreateContainer(ContainerSpec),
    StartContainer(String),
    StreamLogs(String),
    FetchLogs(String),
    WaitContainer(String),
    RemoveContainer(String),
    PullImage(String),
    ListImages(String),
}

/// Scripted [`ContainerEngine`] that records every call
///
/// Containers exit with the queued exit codes in order, then with 0.
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    exit_codes: Mutex<VecDeque<i64>>,
    bind_sources_at_create: Mutex<Vec<(PathBuf, bool)>>,
    bind_contents_at_create: Mutex<Vec<(PathBuf, String)>>,
    created: AtomicUsize,
    warnings: Vec<String>,
    log_chunks: Vec<String>,
    local_images: Vec<ImageInfo>,
    pull_error: Option<String>,
    create_error: Option<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_codes: Mutex::new(VecDeque::new()),
            bind_sources_at_create: Mutex::new(Vec::new()),
            bind_contents_at_create: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            warnings: Vec::new(),
            log_chunks: Vec::new(),
            local_images: Vec::new(),
            pull_error: None,
            create_error: None,
        }
    }

    /// Every created container reports these warnings.
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.warnings = warnings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exit_codes(self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.exit_codes.lock().unwrap().extend(codes);
        self
    }

    /// Output chunks, served by both the live stream and `fetch_logs`.
    pub fn with_log_chunks(mut self, chunks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.log_chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_local_image(mut self, image: ImageInfo) -> Self {
        self.local_images.push(image);
        self
    }

    pub fn with_pull_error(mut self, message: impl Into<String>) -> Self {
        self.pull_error = Some(message.into());
        self
    }

    pub fn with_create_error(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The specs of every container created so far
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::CreateContainer(spec) => Some(spec),
                _ => None,
            })
            .collect()
    }

    /// Bind sources seen at creation time and whether each existed then
    pub fn bind_sources_at_create(&self) -> Vec<(PathBuf, bool)> {
        self.bind_sources_at_create.lock().unwrap().clone()
    }

    /// Contents of every bind source that was a readable file at creation time
    pub fn bind_file_contents(&self) -> Vec<(PathBuf, String)> {
        self.bind_contents_at_create.lock().unwrap().clone()
    }

    pub fn was_removed(&self, id: &str) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, EngineCall::RemoveContainer(removed) if removed == id))
    }

    /// The id the `n`th created container gets, counting from zero
    pub fn container_id(n: usize) -> String {
        format!("c0ffee{:058x}", n)
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<CreatedContainer, EngineError> {
        self.record(EngineCall::CreateContainer(spec.clone()));

        if let Some(message) = &self.create_error {
            return Err(EngineError::Other(message.clone()));
        }

        self.bind_sources_at_create.lock().unwrap().extend(
            spec.mounts
                .binds
                .keys()
                .map(|host| (host.clone(), host.exists())),
        );
        self.bind_contents_at_create.lock().unwrap().extend(
            spec.mounts
                .binds
                .keys()
                .filter(|host| host.is_file())
                .filter_map(|host| Some((host.clone(), fs::read_to_string(host).ok()?))),
        );

        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedContainer {
            id: Self::container_id(n),
            warnings: self.warnings.clone(),
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(EngineCall::StartContainer(id.to_string()));
        Ok(())
    }

    fn stream_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<String, EngineError>> {
        self.record(EngineCall::StreamLogs(id.to_string()));
        stream::iter(self.log_chunks.clone().into_iter().map(Ok)).boxed()
    }

    async fn fetch_logs(&self, id: &str) -> Result<String, EngineError> {
        self.record(EngineCall::FetchLogs(id.to_string()));
        Ok(self.log_chunks.concat())
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        self.record(EngineCall::WaitContainer(id.to_string()));
        Ok(self.exit_codes.lock().unwrap().pop_front().unwrap_or(0))
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(EngineCall::RemoveContainer(id.to_string()));
        Ok(())
    }

    async fn pull_image(&self, image: &ImageRef) -> Result<(), EngineError> {
        self.record(EngineCall::PullImage(image.to_string()));
        match &self.pull_error {
            Some(message) => Err(EngineError::Pull {
                image: image.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageInfo>, EngineError> {
        self.record(EngineCall::ListImages(repository.to_string()));
        Ok(self.local_images.clone())
    }
}
