use crate::validation::rules::{
    EnvironmentRule, FpmOptionsRule, ImageNameRule, RequiredFieldsRule, ValidationRule,
    VolumePathsRule,
};
use serde_yaml::Value;
use tracing::{debug, error};

/// Every problem found in a configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    /// Logs the report: one error line per problem, or a debug note when clean.
    pub fn log(&self) {
        if self.is_valid() {
            debug!("The configuration has been verified without errors");
            return;
        }

        error!("The following errors were encountered while verifying the configuration:");
        for message in &self.errors {
            error!("  - {}", message);
        }
    }
}

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Runs every rule against `document` and collects all of their messages.
    ///
    /// Rules keep running after earlier ones report problems. Missing local
    /// volume directories are created along the way.
    pub fn validate(&self, document: &Value) -> ValidationReport {
        let Some(root) = document.as_mapping() else {
            return ValidationReport {
                errors: vec!["The configuration has to be a mapping of sections.".to_string()],
            };
        };

        let mut errors = Vec::new();
        for rule in &self.rules {
            let before = errors.len();
            rule.validate(root, &mut errors);
            if errors.len() > before {
                debug!(rule = rule.name(), found = errors.len() - before, "Validation rule failed");
            }
        }

        ValidationReport { errors }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(ImageNameRule),
                Box::new(VolumePathsRule),
                Box::new(EnvironmentRule),
                Box::new(FpmOptionsRule),
            ],
        }
    }
}

/// Validates `document` with the default rule set and returns the messages.
pub fn validate(document: &Value) -> Vec<String> {
    Validator::new().validate(document).into_errors()
}
