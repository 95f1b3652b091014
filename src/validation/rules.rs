use crate::config::types::{fpm_value, scalar_to_string};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, trace};

/// A single check over the root mapping of a configuration document.
///
/// Rules never stop at the first problem: every message is pushed to `errors`
/// so the whole set can be reported in one go.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, document: &Mapping, errors: &mut Vec<String>);
}

/// Sections and fields that must be present.
///
/// `build` is optional, but once present it needs an image and a script.
/// `package` must always be there with `fpm` and `volumes`.
pub struct RequiredFieldsRule;

const BUILD_FIELDS: &[&str] = &["image", "script"];
const PACKAGE_FIELDS: &[&str] = &["volumes", "fpm"];

impl ValidationRule for RequiredFieldsRule {
    fn name(&self) -> &'static str {
        "RequiredFields"
    }

    fn validate(&self, document: &Mapping, errors: &mut Vec<String>) {
        match document.get("build") {
            None => debug!("No \"build\" section found in configuration"),
            Some(section) => check_section(section, "build", BUILD_FIELDS, errors),
        }

        match document.get("package") {
            None => errors.push("The \"package\" section is missing.".to_string()),
            Some(section) => check_section(section, "package", PACKAGE_FIELDS, errors),
        }
    }
}

fn check_section(section: &Value, name: &str, fields: &[&str], errors: &mut Vec<String>) {
    let Some(mapping) = section.as_mapping() else {
        errors.push(format!("The \"{}\" section has to be a mapping.", name));
        return;
    };

    for field in fields {
        if is_missing(mapping.get(*field)) {
            errors.push(format!("\"{}\" is required in the {} section.", field, name));
        }
    }
}

/// Absent, `null` and empty strings count as missing; an empty mapping does not.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Image names have to be strings when given.
pub struct ImageNameRule;

impl ValidationRule for ImageNameRule {
    fn name(&self) -> &'static str {
        "ImageName"
    }

    fn validate(&self, document: &Mapping, errors: &mut Vec<String>) {
        for section in ["build", "package"] {
            let image = document
                .get(section)
                .and_then(Value::as_mapping)
                .and_then(|mapping| mapping.get("image"));

            match image {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(_) => errors.push(format!(
                    "The image in the {} section has to be a string.",
                    section
                )),
            }
        }
    }
}

/// Outcome of making sure a local volume path is usable.
#[derive(Debug)]
pub enum LocalPathStatus {
    Existing,
    Created,
    Uncreatable(io::Error),
}

/// Makes sure `path` exists, creating it as a directory when it does not.
///
/// Creation failures are returned as data; the caller decides what to report.
pub fn ensure_local_directory(path: &Path) -> LocalPathStatus {
    if path.exists() {
        return LocalPathStatus::Existing;
    }

    trace!(path = %path.display(), "Creating a directory at the local path");
    match fs::create_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Created directory as the path did not exist");
            LocalPathStatus::Created
        }
        Err(error) => LocalPathStatus::Uncreatable(error),
    }
}

/// Volume tables map local paths that exist (or can be created) to absolute
/// container paths.
///
/// Missing local directories are created here, so running this rule mutates
/// the filesystem.
pub struct VolumePathsRule;

impl ValidationRule for VolumePathsRule {
    fn name(&self) -> &'static str {
        "VolumePaths"
    }

    fn validate(&self, document: &Mapping, errors: &mut Vec<String>) {
        for section in ["build", "package"] {
            let volumes = document
                .get(section)
                .and_then(Value::as_mapping)
                .and_then(|mapping| mapping.get("volumes"));

            match volumes {
                None | Some(Value::Null) => {}
                Some(Value::Mapping(entries)) => check_volumes(entries, section, errors),
                Some(_) => errors.push(format!(
                    "The volumes in the {} section have to be a mapping of local paths to container paths.",
                    section
                )),
            }
        }
    }
}

fn check_volumes(entries: &Mapping, section: &str, errors: &mut Vec<String>) {
    for (local, container) in entries {
        match scalar_to_string(local) {
            Some(local_path) => {
                if let LocalPathStatus::Uncreatable(error) =
                    ensure_local_directory(Path::new(&local_path))
                {
                    errors.push(format!(
                        "The path \"{}\" specified as a {} volume does not exist on the local machine and could not be created: {}",
                        local_path, section, error
                    ));
                }
            }
            None => errors.push(format!(
                "A local path specified as a {} volume has to be a string.",
                section
            )),
        }

        match container.as_str() {
            Some(container_path) if is_absolute_container_path(container_path) => {}
            Some(container_path) => errors.push(format!(
                "The path \"{}\" specified as a {} volume has to be absolute.",
                container_path, section
            )),
            None => errors.push(format!(
                "A container path specified as a {} volume has to be a string.",
                section
            )),
        }
    }
}

/// Container paths follow POSIX rules whatever the host is.
pub fn is_absolute_container_path(path: &str) -> bool {
    path.starts_with('/')
}

/// `environment` has to be a flat mapping of names to scalar values.
pub struct EnvironmentRule;

impl ValidationRule for EnvironmentRule {
    fn name(&self) -> &'static str {
        "Environment"
    }

    fn validate(&self, document: &Mapping, errors: &mut Vec<String>) {
        let Some(environment) = document.get("environment") else {
            return;
        };

        let flat = environment.as_mapping().is_some_and(|entries| {
            entries.iter().all(|(name, value)| {
                name.as_str().is_some() && scalar_to_string(value).is_some()
            })
        });

        if !flat {
            errors.push(
                "The environment variables should be described as a flat mapping of names to values."
                    .to_string(),
            );
        }
    }
}

/// Every `package.fpm` entry has to be representable on the fpm command line.
pub struct FpmOptionsRule;

impl ValidationRule for FpmOptionsRule {
    fn name(&self) -> &'static str {
        "FpmOptions"
    }

    fn validate(&self, document: &Mapping, errors: &mut Vec<String>) {
        let fpm = document
            .get("package")
            .and_then(Value::as_mapping)
            .and_then(|mapping| mapping.get("fpm"));

        match fpm {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(options)) => {
                for (key, value) in options {
                    let Some(key) = scalar_to_string(key) else {
                        errors.push("fpm option names have to be strings.".to_string());
                        continue;
                    };
                    if let Err(reason) = fpm_value(value) {
                        errors.push(format!(
                            "The configuration item at package => fpm => {} is invalid: {}.",
                            key, reason
                        ));
                    }
                }
            }
            Some(_) => errors.push(
                "The fpm options in the package section have to be a mapping.".to_string(),
            ),
        }
    }
}
