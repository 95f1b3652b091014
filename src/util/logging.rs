//! Structured logging setup for berth
//!
//! Initialises the `tracing` subscriber once per process. The level comes from
//! the command line verbosity unless `BERTH_LOG_LEVEL` or `--log-level`
//! overrides it, and `RUST_LOG` overrides everything.
//!
//! Logs go to stderr. Output of the build and package containers bypasses the
//! subscriber and is written to stdout by the progress handler.
//!
//! # Example
//!
//! ```no_run
//! use berth::util::{init_logging, LoggingConfig};
//! use tracing::{info, Level};
//!
//! init_logging(LoggingConfig::with_level(Level::DEBUG));
//! info!("Building project.");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., berth::pipeline) in logs
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Picks the level from an explicit override or falls back to `level`.
    ///
    /// Targets are shown from DEBUG down, where messages from different
    /// modules interleave.
    pub fn resolve(level: Level, level_override: Option<&str>, use_json: bool) -> Self {
        let level = level_override.map(parse_level).unwrap_or(level);
        Self {
            level,
            use_json,
            include_target: level >= Level::DEBUG,
        }
    }
}

/// Parses a log level from a string
///
/// Unknown levels fall back to `Level::INFO`.
///
/// ```
/// use berth::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn default_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::new(format!("warn,berth={}", level));
    for directive in ["h2=warn", "hyper=warn", "bollard=warn"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes the logging system; calls after the first are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            default_filter(config.level)
        };

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .without_time(),
                )
                .init();
        }
    });
}
