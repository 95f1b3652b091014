//! berth - build packages inside Docker containers
//!
//! berth reads a YAML configuration file, runs a build script inside a build
//! container and then runs [fpm](https://fpm.readthedocs.io) inside a
//! packaging container to turn the build output into a package.
//!
//! # Core Concepts
//!
//! - **Configuration**: the `build`, `package` and `environment` sections of
//!   the YAML file, validated up front with every problem reported at once
//! - **Phase**: the build step or the package step, each in its own container
//! - **Container engine**: the [`ContainerEngine`] seam the pipeline talks to,
//!   implemented over the Docker API by [`DockerEngine`]
//!
//! # Example Usage
//!
//! ```no_run
//! use berth::{Configuration, DockerEngine, PhaseSelection, Pipeline, RunContext, Validator};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = berth::config::read("berth.yaml")?;
//! let report = Validator::new().validate(&document);
//! if !report.is_valid() {
//!     report.log();
//!     return Ok(());
//! }
//!
//! let configuration = Configuration::from_document(&document)?;
//! let context = RunContext::new(Arc::new(DockerEngine::connect()?));
//! let succeeded = Pipeline::new(context)
//!     .run(&configuration, PhaseSelection::All)
//!     .await?;
//! println!("succeeded: {}", succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`config`]: configuration document parsing and typed sections
//! - [`validation`]: configuration validation rules
//! - [`volumes`]: local path to container path mapping
//! - [`fpm`]: fpm command line construction
//! - [`engine`]: container engine abstraction and Docker implementation
//! - [`runner`]: single container lifecycle
//! - [`pipeline`]: the build-then-package run

pub mod cli;
pub mod config;
pub mod engine;
pub mod fpm;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod settings;
pub mod util;
pub mod validation;
pub mod volumes;

pub use config::{ConfigError, Configuration, FpmValue};
pub use engine::{ContainerEngine, ContainerSpec, DockerEngine, EngineError, MockEngine};
pub use pipeline::{Phase, PhaseSelection, Pipeline, PipelineError, RunContext, Verbosity};
pub use progress::{LoggingHandler, ProgressEvent, ProgressHandler};
pub use runner::{ContainerRunner, ExecutionResult, RunnerError};
pub use settings::{Settings, SettingsError};
pub use validation::{ValidationReport, Validator};
pub use volumes::{map_volumes, VolumeMapping};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
