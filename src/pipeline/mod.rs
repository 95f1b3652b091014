//! Build-then-package pipeline
//!
//! [`Pipeline::run`] makes the needed images available, runs the build
//! script in its container and then runs fpm in the package container. Each
//! phase gets a fresh container which is removed afterwards unless the
//! configuration keeps containers.

pub mod context;
pub mod orchestrator;
pub mod phase;
pub mod script;

pub use context::{RunContext, Verbosity};
pub use orchestrator::{PhaseSelection, Pipeline, PipelineError};
pub use phase::Phase;
pub use script::BuildScriptFile;
