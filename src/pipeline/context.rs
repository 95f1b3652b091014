//! Run context threaded through the pipeline

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Level;

use crate::config::DEFAULT_PACKAGE_IMAGE;
use crate::engine::ContainerEngine;
use crate::progress::{LoggingHandler, ProgressHandler};
use crate::runner::RunOptions;
use crate::settings::Settings;

/// How much the user asked to see, fixed for the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::ERROR,
            Verbosity::Normal => Level::INFO,
            Verbosity::Verbose => Level::DEBUG,
            Verbosity::Debug => Level::TRACE,
        }
    }

    /// Container output is followed live from `--verbose` up
    pub fn streams_logs(self) -> bool {
        self >= Verbosity::Verbose
    }

    pub fn shows_output(self) -> bool {
        self >= Verbosity::Verbose
    }
}

/// Everything a pipeline run needs besides the configuration
///
/// Built once before the run and never changed during it.
#[derive(Clone)]
pub struct RunContext {
    pub engine: Arc<dyn ContainerEngine>,
    pub progress: Arc<dyn ProgressHandler>,
    pub verbosity: Verbosity,
    /// Overrides the verbosity's choice of following output live
    pub stream_logs: Option<bool>,
    pub default_package_image: String,
    pub script_dir: PathBuf,
}

impl RunContext {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self {
            engine,
            progress: Arc::new(LoggingHandler::new()),
            verbosity: Verbosity::default(),
            stream_logs: None,
            default_package_image: DEFAULT_PACKAGE_IMAGE.to_string(),
            script_dir: PathBuf::from("."),
        }
    }

    pub fn from_settings(engine: Arc<dyn ContainerEngine>, settings: &Settings, verbosity: Verbosity) -> Self {
        Self::new(engine)
            .with_verbosity(verbosity)
            .with_default_package_image(settings.package_image.clone())
            .with_script_dir(settings.script_dir.clone())
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_stream_logs(mut self, stream_logs: bool) -> Self {
        self.stream_logs = Some(stream_logs);
        self
    }

    pub fn with_default_package_image(mut self, image: impl Into<String>) -> Self {
        self.default_package_image = image.into();
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    pub(crate) fn run_options(&self, keep: bool) -> RunOptions {
        RunOptions {
            keep,
            stream_logs: self
                .stream_logs
                .unwrap_or_else(|| self.verbosity.streams_logs()),
            show_output: self.verbosity.shows_output(),
        }
    }
}
