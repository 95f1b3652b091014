//! Process settings for berth
//!
//! Settings come from environment variables with sensible defaults. They cover
//! how berth itself behaves; the build and package definitions live in the
//! YAML configuration file.
//!
//! # Environment Variables
//!
//! - `BERTH_PACKAGE_IMAGE`: Image used for packaging when `package.image` is not set - default: "tenzer/fpm"
//! - `BERTH_SCRIPT_DIR`: Directory the temporary build script is written to - default: "."
//! - `BERTH_LOG_LEVEL`: Log level overriding the command line verbosity (trace|debug|info|warn|error)
//! - `BERTH_LOG_JSON`: Emit logs as JSON (true|false) - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use berth::Settings;
//!
//! let settings = Settings::default();
//! settings.validate().expect("Invalid settings");
//! println!("{}", settings);
//! ```

use crate::config::DEFAULT_PACKAGE_IMAGE;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_SCRIPT_DIR: &str = ".";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Image for the package phase when the configuration names none
    pub package_image: String,

    /// Where the temporary build script is written; it must be bind-mountable
    pub script_dir: PathBuf,

    /// Log level from the environment, if any
    pub log_level: Option<String>,

    pub log_json: bool,
}

impl Default for Settings {
    /// Loads settings from `BERTH_*` environment variables, falling back to defaults.
    fn default() -> Self {
        let package_image = env::var("BERTH_PACKAGE_IMAGE")
            .ok()
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PACKAGE_IMAGE.to_string());

        let script_dir = env::var("BERTH_SCRIPT_DIR")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPT_DIR));

        let log_level = env::var("BERTH_LOG_LEVEL")
            .ok()
            .map(|level| level.to_lowercase());

        let log_json = env::var("BERTH_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            package_image,
            script_dir,
            log_level,
            log_json,
        }
    }
}

impl Settings {
    /// Checks that the log level is known and the script directory is a directory.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(level) = &self.log_level {
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                _ => {
                    return Err(SettingsError::ValidationFailed(format!(
                        "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                        level
                    )))
                }
            }
        }

        if !self.script_dir.is_dir() {
            return Err(SettingsError::ValidationFailed(format!(
                "Script directory {} does not exist or is not a directory",
                self.script_dir.display()
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Berth Settings:")?;
        writeln!(f, "  Package Image: {}", self.package_image)?;
        writeln!(f, "  Script Dir: {}", self.script_dir.display())?;
        if let Some(ref level) = self.log_level {
            writeln!(f, "  Log Level: {}", level)?;
        }
        writeln!(f, "  Log JSON: {}", self.log_json)?;
        Ok(())
    }
}
