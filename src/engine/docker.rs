use super::{ContainerEngine, ContainerSpec, CreatedContainer, EngineError, ImageInfo, ImageRef};
use async_trait::async_trait;
use bollard::container::{
    Config, LogsOptions, RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::service::HostConfig;
use bollard::Docker;
use futures_util::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use tracing::{debug, trace};

/// [`ContainerEngine`] backed by the local Docker daemon
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using the local defaults (`DOCKER_HOST` or the default socket).
    pub fn connect() -> Result<Self, EngineError> {
        debug!("Creating Docker client");
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }

    fn log_options(follow: bool) -> LogsOptions<String> {
        LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<CreatedContainer, EngineError> {
        let volumes: HashMap<String, HashMap<(), ()>> = spec
            .mounts
            .volumes
            .iter()
            .map(|path| (path.clone(), HashMap::new()))
            .collect();

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            env: Some(spec.env_pairs()),
            volumes: Some(volumes),
            host_config: Some(HostConfig {
                binds: Some(spec.mounts.bind_specs()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container::<String, String>(None, config)
            .await?;

        Ok(CreatedContainer {
            id: response.id,
            warnings: response.warnings,
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    fn stream_logs<'a>(&'a self, id: &'a str) -> BoxStream<'a, Result<String, EngineError>> {
        self.docker
            .logs(id, Some(Self::log_options(true)))
            .map(|chunk| chunk.map(|output| output.to_string()).map_err(EngineError::from))
            .boxed()
    }

    async fn fetch_logs(&self, id: &str) -> Result<String, EngineError> {
        let mut stream = self.docker.logs(id, Some(Self::log_options(false)));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            output.push_str(&chunk?.to_string());
        }
        Ok(output)
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let mut stream = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits arrive as an error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(error)) => Err(error.into()),
            None => Err(EngineError::NoExitStatus(id.to_string())),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .remove_container(id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }

    async fn pull_image(&self, image: &ImageRef) -> Result<(), EngineError> {
        let options = CreateImageOptions {
            from_image: image.repository(),
            tag: image.reference(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    if let Some(status) = info.status {
                        trace!(image = %image, "{}", status);
                    }
                }
                Err(error) => {
                    return Err(EngineError::Pull {
                        image: image.to_string(),
                        message: error.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageInfo>, EngineError> {
        let mut filters = HashMap::new();
        filters.insert("reference".to_string(), vec![repository.to_string()]);

        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                filters,
                ..Default::default()
            }))
            .await?;

        Ok(images
            .into_iter()
            .map(|summary| ImageInfo {
                id: summary.id,
                tags: summary.repo_tags,
                digests: summary.repo_digests,
            })
            .collect())
    }
}
