use super::ConfigError;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Reads and parses the configuration file at `path`.
pub fn read(path: impl AsRef<Path>) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    trace!(path = %path.display(), "Reading the configuration file");

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document = parse(&contents)?;
    debug!(path = %path.display(), "The configuration file has been parsed");
    trace!("Parsed configuration:\n{:?}", document);
    Ok(document)
}

/// Parses a YAML configuration document.
///
/// An empty document parses to `Value::Null`; rejecting it is left to the
/// validator so it shows up next to every other problem.
pub fn parse(contents: &str) -> Result<Value, ConfigError> {
    Ok(serde_yaml::from_str(contents)?)
}
