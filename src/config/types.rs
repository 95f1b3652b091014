use super::ConfigError;
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};
use serde_yaml::Value;

/// Image used for the package phase when `package.image` is not set
pub const DEFAULT_PACKAGE_IMAGE: &str = "tenzer/fpm";

/// Local path to in-container path, in document order
pub type VolumeTable = IndexMap<String, String>;

/// fpm options in document order; the order is reproduced on the command line
pub type FpmOptions = IndexMap<String, FpmValue>;

/// A single value from the `package.fpm` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FpmValue {
    /// Boolean flag; only `true` produces output
    Flag(bool),
    /// Flag followed by a single value
    Scalar(String),
    /// Flag repeated once per item, or positional arguments under `_arguments`
    List(Vec<String>),
    /// Nested key/value pairs, meaning depends on the option name
    Map(IndexMap<String, String>),
}

impl<'de> Deserialize<'de> for FpmValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        fpm_value(&value).map_err(de::Error::custom)
    }
}

/// A YAML scalar (string, number or boolean) in its string form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        scalar_to_string(&value)
            .map(ScalarString)
            .ok_or_else(|| de::Error::custom("expected a string, number or boolean"))
    }
}

fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ScalarString::deserialize(deserializer)?.0)
}

fn deserialize_optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ScalarString>::deserialize(deserializer)?.map(|scalar| scalar.0))
}

/// Flat scalar mapping; `null` reads as empty
fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<IndexMap<ScalarString, ScalarString>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.0, value.0))
        .collect())
}

fn deserialize_fpm_options<'de, D>(deserializer: D) -> Result<FpmOptions, D::Error>
where
    D: Deserializer<'de>,
{
    let options: IndexMap<ScalarString, FpmValue> = IndexMap::deserialize(deserializer)?;
    Ok(options.into_iter().map(|(key, value)| (key.0, value)).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildSection {
    #[serde(deserialize_with = "deserialize_scalar")]
    pub image: String,
    #[serde(deserialize_with = "deserialize_scalar")]
    pub script: String,
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub volumes: VolumeTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageSection {
    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub image: Option<String>,
    #[serde(deserialize_with = "deserialize_fpm_options")]
    pub fpm: FpmOptions,
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub volumes: VolumeTable,
}

impl PackageSection {
    /// The configured image, or `default` when the document leaves it out
    pub fn image_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.image.as_deref().unwrap_or(default)
    }
}

/// A validated configuration document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub build: Option<BuildSection>,
    pub package: PackageSection,
    #[serde(default, deserialize_with = "deserialize_scalar_map")]
    pub environment: IndexMap<String, String>,
    /// Set from the command line, never from the document
    #[serde(skip)]
    pub keep_containers: bool,
}

impl Configuration {
    /// Converts a parsed document into a typed configuration.
    ///
    /// The document is expected to have passed [`crate::validation::Validator`];
    /// anything it would have rejected comes back as [`ConfigError::InvalidValue`].
    pub fn from_document(document: &Value) -> Result<Self, ConfigError> {
        serde_yaml::from_value(document.clone()).map_err(|error| ConfigError::InvalidValue {
            path: "configuration".to_string(),
            reason: error.to_string(),
        })
    }

    /// Parses and converts a YAML string in one go, without validation.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::from_document(&super::parse(contents)?)
    }

    pub fn with_keep_containers(mut self, keep: bool) -> Self {
        self.keep_containers = keep;
        self
    }
}

/// Classifies a YAML value as an fpm option value.
pub(crate) fn fpm_value(value: &Value) -> Result<FpmValue, &'static str> {
    match value {
        Value::Null => Ok(FpmValue::Flag(false)),
        Value::Bool(enabled) => Ok(FpmValue::Flag(*enabled)),
        Value::String(_) | Value::Number(_) => Ok(FpmValue::Scalar(
            scalar_to_string(value).unwrap_or_default(),
        )),
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_to_string(item).ok_or("list items must be scalars"))
            .collect::<Result<Vec<_>, _>>()
            .map(FpmValue::List),
        Value::Mapping(entries) => entries
            .iter()
            .map(|(k, v)| match (scalar_to_string(k), scalar_to_string(v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err("nested entries must map scalars to scalars"),
            })
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(FpmValue::Map),
        Value::Tagged(_) => Err("tagged values are not supported"),
    }
}

/// Renders a YAML scalar the way it is passed on to containers.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = r#"
build:
  image: alpine
  script: echo hi
package:
  fpm:
    t: deb
    _arguments:
      - mypkg
  volumes: {}
"#;

    #[test]
    fn test_converts_full_document() {
        let config = Configuration::from_yaml_str(SCENARIO_A).unwrap();

        let build = config.build.expect("build section");
        assert_eq!(build.image, "alpine");
        assert_eq!(build.script, "echo hi");
        assert!(build.volumes.is_empty());

        assert_eq!(config.package.image, None);
        assert_eq!(
            config.package.fpm.get("t"),
            Some(&FpmValue::Scalar("deb".to_string()))
        );
        assert_eq!(
            config.package.fpm.get("_arguments"),
            Some(&FpmValue::List(vec!["mypkg".to_string()]))
        );
        assert!(config.environment.is_empty());
        assert!(!config.keep_containers);
    }

    #[test]
    fn test_fpm_order_is_preserved() {
        let config = Configuration::from_yaml_str(
            "package:\n  volumes: {}\n  fpm:\n    s: dir\n    n: app\n    a: all\n    depends: [a, b]\n",
        )
        .unwrap();
        let keys: Vec<&str> = config.package.fpm.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["s", "n", "a", "depends"]);
    }

    #[test]
    fn test_fpm_value_classification() {
        let config = Configuration::from_yaml_str(
            r#"
package:
  volumes: {}
  fpm:
    f: true
    force: false
    nothing: ~
    v: 1.2
    depends: [libc, 3]
    template-value:
      port: 8080
"#,
        )
        .unwrap();
        let fpm = &config.package.fpm;

        assert_eq!(fpm["f"], FpmValue::Flag(true));
        assert_eq!(fpm["force"], FpmValue::Flag(false));
        assert_eq!(fpm["nothing"], FpmValue::Flag(false));
        assert_eq!(fpm["v"], FpmValue::Scalar("1.2".to_string()));
        assert_eq!(
            fpm["depends"],
            FpmValue::List(vec!["libc".to_string(), "3".to_string()])
        );
        match &fpm["template-value"] {
            FpmValue::Map(entries) => assert_eq!(entries["port"], "8080"),
            other => panic!("Expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_list_in_fpm_is_rejected() {
        let err = Configuration::from_yaml_str(
            "package:\n  volumes: {}\n  fpm:\n    depends: [[a]]\n",
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { reason, .. } => {
                assert!(reason.contains("list items must be scalars"))
            }
            other => panic!("Expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_null_sections_read_as_empty() {
        let config = Configuration::from_yaml_str(
            "build: ~\nenvironment: ~\npackage:\n  image: ~\n  volumes: ~\n  fpm: {}\n",
        )
        .unwrap();
        assert!(config.build.is_none());
        assert!(config.environment.is_empty());
        assert!(config.package.volumes.is_empty());
        assert_eq!(config.package.image, None);
    }

    #[test]
    fn test_scalar_volume_keys_and_values_are_stringified() {
        let config = Configuration::from_yaml_str(
            "build:\n  image: alpine\n  script: ls\n  volumes:\n    2024: /out\npackage:\n  volumes: {}\n  fpm: {}\n",
        )
        .unwrap();
        let build = config.build.unwrap();
        assert_eq!(build.volumes["2024"], "/out");
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = Configuration::from_yaml_str(
            "package:\n  volumes: {}\n  fpm: {}\n  notes: whatever\nextra: 1\n",
        )
        .unwrap();
        assert!(config.package.fpm.is_empty());
    }

    #[test]
    fn test_environment_values_are_stringified() {
        let config = Configuration::from_yaml_str(
            "environment:\n  VERSION: 1.0\n  DEBUG: true\n  NAME: app\npackage:\n  volumes: {}\n  fpm: {}\n",
        )
        .unwrap();
        assert_eq!(config.environment["VERSION"], "1.0");
        assert_eq!(config.environment["DEBUG"], "true");
        assert_eq!(config.environment["NAME"], "app");
    }

    #[test]
    fn test_package_image_default() {
        let config =
            Configuration::from_yaml_str("package:\n  volumes: {}\n  fpm: {}\n").unwrap();
        assert_eq!(config.package.image_or(DEFAULT_PACKAGE_IMAGE), "tenzer/fpm");

        let config = Configuration::from_yaml_str(
            "package:\n  image: example/fpm:1.0\n  volumes: {}\n  fpm: {}\n",
        )
        .unwrap();
        assert_eq!(config.package.image_or(DEFAULT_PACKAGE_IMAGE), "example/fpm:1.0");
    }

    #[test]
    fn test_missing_package_section() {
        let err = Configuration::from_yaml_str("build:\n  image: alpine\n  script: ls\n")
            .unwrap_err();
        assert!(err.to_string().contains("package"));
    }

    #[test]
    fn test_keep_containers_is_injected() {
        let config = Configuration::from_yaml_str(SCENARIO_A)
            .unwrap()
            .with_keep_containers(true);
        assert!(config.keep_containers);
    }
}
