use super::commands::CliArgs;
use crate::config::{self, Configuration};
use crate::engine::{ContainerEngine, DockerEngine, EngineError};
use crate::pipeline::{PhaseSelection, Pipeline, RunContext};
use crate::settings::Settings;
use crate::validation::Validator;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs berth for the parsed arguments and returns the process exit code.
pub async fn handle_run(args: &CliArgs, settings: &Settings) -> i32 {
    handle_run_with(args, settings, || {
        DockerEngine::connect().map(|engine| Arc::new(engine) as Arc<dyn ContainerEngine>)
    })
    .await
}

/// Like [`handle_run`], with the container engine supplied by `connect`.
///
/// `connect` is only called once the configuration has been loaded and
/// validated.
pub async fn handle_run_with<F>(args: &CliArgs, settings: &Settings, connect: F) -> i32
where
    F: FnOnce() -> Result<Arc<dyn ContainerEngine>, EngineError>,
{
    match run(args, settings, connect).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

async fn run<F>(args: &CliArgs, settings: &Settings, connect: F) -> Result<bool>
where
    F: FnOnce() -> Result<Arc<dyn ContainerEngine>, EngineError>,
{
    let selection = PhaseSelection::from_flags(args.build_only, args.package_only)?;

    settings.validate()?;
    debug!("{}", settings);

    let Some(configuration) = load_configuration(args)? else {
        return Ok(false);
    };

    let engine = connect()?;
    let context = RunContext::from_settings(engine, settings, args.verbosity());

    let succeeded = Pipeline::new(context).run(&configuration, selection).await?;
    if !succeeded {
        info!("Stopping after the failed phase");
    }
    Ok(succeeded)
}

/// Reads and validates the configuration file.
///
/// Returns `None` when validation failed; every problem has been logged by then.
fn load_configuration(args: &CliArgs) -> Result<Option<Configuration>> {
    let path = &args.config_file;
    debug!(path = %path.display(), "Reading configuration");

    let document = config::read(path)?;

    let report = Validator::new().validate(&document);
    if !report.is_valid() {
        report.log();
        return Ok(None);
    }
    debug!("Configuration is valid");

    let configuration =
        Configuration::from_document(&document)?.with_keep_containers(args.keep_containers);

    Ok(Some(configuration))
}
