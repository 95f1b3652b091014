use berth::cli::{handle_run, CliArgs};
use berth::util::{init_logging, LoggingConfig};
use berth::{Settings, VERSION};

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let settings = Settings::default();

    let level_override = args.log_level.as_deref().or(settings.log_level.as_deref());
    init_logging(LoggingConfig::resolve(
        args.verbosity().level(),
        level_override,
        settings.log_json,
    ));

    debug!("berth v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = handle_run(&args, &settings).await;

    std::process::exit(exit_code);
}
