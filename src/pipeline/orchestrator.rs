use super::context::RunContext;
use super::phase::Phase;
use super::script::BuildScriptFile;
use crate::config::{BuildSection, Configuration};
use crate::engine::{ensure_image, ContainerSpec, EngineError};
use crate::fpm::build_command;
use crate::progress::ProgressEvent;
use crate::runner::{ContainerRunner, RunnerError};
use crate::volumes::map_volumes;
use std::io;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Which phases a run executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhaseSelection {
    #[default]
    All,
    BuildOnly,
    PackageOnly,
}

impl PhaseSelection {
    pub fn from_flags(build_only: bool, package_only: bool) -> Result<Self, PipelineError> {
        match (build_only, package_only) {
            (true, true) => Err(PipelineError::ConflictingSelection),
            (true, false) => Ok(PhaseSelection::BuildOnly),
            (false, true) => Ok(PhaseSelection::PackageOnly),
            (false, false) => Ok(PhaseSelection::All),
        }
    }

    pub fn runs_build(self) -> bool {
        self != PhaseSelection::PackageOnly
    }

    pub fn runs_package(self) -> bool {
        self != PhaseSelection::BuildOnly
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("--build-only and --package-only are mutually exclusive.")]
    ConflictingSelection,

    #[error("Failed to handle the temporary build script: {0}")]
    Script(#[source] io::Error),

    #[error("Failed to resolve volume paths: {0}")]
    Volumes(#[source] io::Error),

    #[error("Unable to make image {image} available: {source}")]
    Image {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Runs the build phase and then the package phase, stopping at the first
/// phase that does not succeed.
pub struct Pipeline {
    context: RunContext,
}

impl Pipeline {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Returns whether every phase that ran succeeded.
    ///
    /// A phase that fails, or whose container the engine warned about, makes
    /// the result `false`. Engine and filesystem problems are errors.
    pub async fn run(&self, config: &Configuration, selection: PhaseSelection) -> Result<bool, PipelineError> {
        let start = Instant::now();
        let progress = self.context.progress.as_ref();

        let build = match (&config.build, selection.runs_build()) {
            (Some(build), true) => Some(build),
            (None, _) => {
                self.skip(Phase::Build, "No build configuration provided, skipping build.");
                None
            }
            (Some(_), false) => {
                self.skip(Phase::Build, "--package-only provided, skipping build.");
                None
            }
        };

        let package_image = config.package.image_or(&self.context.default_package_image);
        let mut images = Vec::new();
        if let Some(build) = build {
            images.push(build.image.as_str());
        }
        if selection.runs_package() && !images.contains(&package_image) {
            images.push(package_image);
        }
        self.ensure_images(&images).await?;

        if let Some(build) = build {
            if !self.run_build(build, config).await? {
                return Ok(false);
            }
        }

        if selection.runs_package() {
            if !self.run_package(config, package_image).await? {
                return Ok(false);
            }
        } else {
            self.skip(Phase::Package, "--build-only provided, skipping packaging.");
        }

        debug!("Pipeline finished in {:.1} seconds", start.elapsed().as_secs_f64());
        progress.on_progress(&ProgressEvent::Completed);
        Ok(true)
    }

    async fn ensure_images(&self, images: &[&str]) -> Result<(), PipelineError> {
        for image in images {
            ensure_image(self.context.engine.as_ref(), image)
                .await
                .map_err(|source| PipelineError::Image {
                    image: image.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn run_build(&self, build: &BuildSection, config: &Configuration) -> Result<bool, PipelineError> {
        let progress = self.context.progress.as_ref();
        progress.on_progress(&ProgressEvent::PhaseStarted { phase: Phase::Build });

        let script =
            BuildScriptFile::create(&build.script, &self.context.script_dir).map_err(PipelineError::Script)?;
        let script_path = script.path().to_path_buf();
        progress.on_progress(&ProgressEvent::ScriptWritten {
            path: script_path.clone(),
        });

        let outcome = self.run_build_container(build, config, &script).await;

        let removed = script.remove();
        match &removed {
            Ok(()) => progress.on_progress(&ProgressEvent::ScriptRemoved { path: script_path }),
            Err(err) => warn!(path = %script_path.display(), "Failed to remove temporary build script: {}", err),
        }

        let succeeded = outcome?;
        removed.map_err(PipelineError::Script)?;
        Ok(succeeded)
    }

    async fn run_build_container(
        &self,
        build: &BuildSection,
        config: &Configuration,
        script: &BuildScriptFile,
    ) -> Result<bool, PipelineError> {
        let mut volumes = build.volumes.clone();
        volumes.insert(script.path().to_string_lossy().into_owned(), script.container_path());
        let mounts = map_volumes(&volumes).map_err(PipelineError::Volumes)?;

        let spec = ContainerSpec::new(
            build.image.clone(),
            vec![script.container_path()],
            mounts,
            config.environment.clone(),
        );

        self.run_phase(Phase::Build, &spec, config.keep_containers).await
    }

    async fn run_package(&self, config: &Configuration, image: &str) -> Result<bool, PipelineError> {
        self.context
            .progress
            .on_progress(&ProgressEvent::PhaseStarted { phase: Phase::Package });

        let command = build_command(&config.package.fpm, &config.environment);
        debug!(command = ?command.args, "Command to be run in packaging container");

        let mounts = map_volumes(&config.package.volumes).map_err(PipelineError::Volumes)?;
        let spec = ContainerSpec::new(image, command.args, mounts, config.environment.clone());

        self.run_phase(Phase::Package, &spec, config.keep_containers).await
    }

    async fn run_phase(&self, phase: Phase, spec: &ContainerSpec, keep: bool) -> Result<bool, PipelineError> {
        let runner = ContainerRunner::new(self.context.engine.as_ref(), self.context.progress.as_ref(), phase);

        match runner.run(spec, self.context.run_options(keep)).await {
            Ok(result) => Ok(result.succeeded()),
            // Already reported through the progress handler
            Err(RunnerError::CreationWarnings { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn skip(&self, phase: Phase, reason: &str) {
        self.context.progress.on_progress(&ProgressEvent::PhaseSkipped {
            phase,
            reason: reason.to_string(),
        });
    }
}
