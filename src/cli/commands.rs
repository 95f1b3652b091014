use crate::pipeline::Verbosity;
use clap::Parser;
use std::path::PathBuf;

/// Docker-driven package builder
#[derive(Parser, Debug, Clone)]
#[command(
    name = "berth",
    about = "Berth uses Docker containers to build packages for you, based on a YAML configuration file.",
    version,
    long_about = "Berth runs your build script inside a build container, then runs fpm inside \
                  a packaging container to turn the result into a package.\n\n\
                  Examples:\n  \
                  berth berth.yaml\n  \
                  berth --verbose berth.yaml\n  \
                  berth --build-only --keep-containers berth.yaml"
)]
pub struct CliArgs {
    #[arg(value_name = "CONFIG FILE", help = "YAML configuration file")]
    pub config_file: PathBuf,

    #[arg(short = 'v', long, help = "Turn on verbose output")]
    pub verbose: bool,

    #[arg(short = 'd', long, help = "Turn on debug output")]
    pub debug: bool,

    #[arg(
        short = 'q',
        long,
        conflicts_with_all = ["verbose", "debug"],
        help = "Quiet mode - only show errors"
    )]
    pub quiet: bool,

    #[arg(long, value_name = "LEVEL", help = "Set logging level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,

    #[arg(short = 'b', long, help = "Only perform the build step")]
    pub build_only: bool,

    #[arg(short = 'p', long, help = "Only perform the package step")]
    pub package_only: bool,

    #[arg(short = 'k', long, help = "Keep the containers around after they have been used")]
    pub keep_containers: bool,
}

impl CliArgs {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }
}
