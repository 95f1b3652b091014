//! Configuration document handling
//!
//! A configuration file is read in two steps. First the raw YAML document is
//! parsed into a [`serde_yaml::Value`] so the validator can report every
//! structural problem at once. Only a document that passed validation is then
//! converted into the typed [`Configuration`].
//!
//! ```no_run
//! use berth::config::{self, Configuration};
//! use berth::validation::Validator;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = config::read("berth.yaml")?;
//! let report = Validator::new().validate(&document);
//! if report.is_valid() {
//!     let config = Configuration::from_document(&document)?;
//!     println!("package image: {:?}", config.package.image);
//! }
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod types;

pub use document::{parse, read};
pub use types::{
    BuildSection, Configuration, FpmOptions, FpmValue, PackageSection, VolumeTable,
    DEFAULT_PACKAGE_IMAGE,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or converting a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML document is malformed
    #[error("{}", format_parse_error(.message, .line, .column))]
    Parse {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    /// A value has a shape the typed configuration cannot represent
    #[error("Invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },
}

fn format_parse_error(message: &str, line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(
            "The configuration file could not be parsed (line {}, column {}): {}",
            line, column, message
        ),
        _ => format!("The configuration file could not be parsed: {}", message),
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        let location = error.location();
        ConfigError::Parse {
            message: error.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }
}
