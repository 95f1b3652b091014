//! fpm command line construction
//!
//! Turns the `package.fpm` options into the argument vector run inside the
//! package container. Keys become flags (`-k` for single characters, `--key`
//! otherwise) and values are encoded by shape:
//!
//! | value | output |
//! |---|---|
//! | `true` | `--key` |
//! | `false` / `null` | nothing |
//! | scalar | `--key value` |
//! | list | `--key a --key b` |
//! | `template-value` map | `--template-value k=v` per entry |
//! | `deb-field` map | `--deb-field "k: v"` per entry |
//! | `_arguments` list or map | positional `item` / `k=v`, after every flag |
//! | any other map | ignored, reported in [`FpmCommand::ignored`] |

use crate::config::{FpmOptions, FpmValue};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::{trace, warn};

/// The packaging tool, always the first token
pub const FPM_BINARY: &str = "fpm";

const ARGUMENTS_KEY: &str = "_arguments";
const TEMPLATE_VALUE_KEY: &str = "template-value";
const DEB_FIELD_KEY: &str = "deb-field";

/// The fpm argument vector plus the options that could not be encoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FpmCommand {
    pub args: Vec<String>,
    pub ignored: Vec<String>,
}

/// Builds the fpm command for `options`, then substitutes `$NAME` and
/// `${NAME}` references from `environment` in every token.
pub fn build_command(options: &FpmOptions, environment: &IndexMap<String, String>) -> FpmCommand {
    let mut args = vec![FPM_BINARY.to_string()];
    let mut positional = Vec::new();
    let mut ignored = Vec::new();

    for (key, value) in options {
        let flag = flag_for(key);

        match (key.as_str(), value) {
            (ARGUMENTS_KEY, FpmValue::List(items)) => positional.extend(items.iter().cloned()),
            (ARGUMENTS_KEY, FpmValue::Map(entries)) => {
                positional.extend(entries.iter().map(|(k, v)| format!("{}={}", k, v)))
            }
            (ARGUMENTS_KEY, FpmValue::Scalar(item)) => positional.push(item.clone()),
            (ARGUMENTS_KEY, FpmValue::Flag(true)) => {
                warn!("The configuration item at package => fpm => {} has to be a list or a mapping and was ignored", key);
                ignored.push(key.clone());
            }
            (_, FpmValue::Flag(true)) => args.push(flag),
            (_, FpmValue::Flag(false)) => {}
            (_, FpmValue::Scalar(item)) => {
                args.push(flag);
                args.push(item.clone());
            }
            (_, FpmValue::List(items)) => {
                for item in items {
                    args.push(flag.clone());
                    args.push(item.clone());
                }
            }
            (TEMPLATE_VALUE_KEY, FpmValue::Map(entries)) => {
                for (name, value) in entries {
                    args.push(flag.clone());
                    args.push(format!("{}={}", name, value));
                }
            }
            (DEB_FIELD_KEY, FpmValue::Map(entries)) => {
                for (field, value) in entries {
                    args.push(flag.clone());
                    args.push(format!("{}: {}", field, value));
                }
            }
            (_, FpmValue::Map(_)) => {
                warn!("The configuration item at package => fpm => {} was not understood and thus ignored", key);
                ignored.push(key.clone());
            }
        }
    }

    args.extend(positional);

    if environment.is_empty() {
        trace!("No environment variables specified for packaging, no replacements performed");
    } else {
        trace!(variables = ?environment.keys().collect::<Vec<_>>(), "Substituting environment variables in the fpm command");
        for arg in &mut args {
            *arg = substitute_variables(arg, environment);
        }
    }

    FpmCommand { args, ignored }
}

/// Turns an option name into a command line flag.
pub fn flag_for(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{}", key)
    } else {
        format!("--{}", key)
    }
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("valid regex")
    })
}

/// Replaces `$NAME` and `${NAME}` with values from `environment`.
///
/// References to names that are not in `environment` are left as written.
pub fn substitute_variables(token: &str, environment: &IndexMap<String, String>) -> String {
    variable_pattern()
        .replace_all(token, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match environment.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(entries: Vec<(&str, FpmValue)>) -> FpmOptions {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn map(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(entries: Vec<(&str, FpmValue)>) -> Vec<String> {
        build_command(&options(entries), &IndexMap::new()).args
    }

    #[test]
    fn test_binary_comes_first() {
        assert_eq!(build(vec![]), strings(&["fpm"]));
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(flag_for("t"), "-t");
        assert_eq!(flag_for("name"), "--name");
        assert_eq!(flag_for("deb-user"), "--deb-user");
    }

    #[test]
    fn test_true_flag_is_emitted_alone() {
        assert_eq!(build(vec![("f", FpmValue::Flag(true))]), strings(&["fpm", "-f"]));
    }

    #[test]
    fn test_false_flag_is_not_emitted() {
        assert_eq!(
            build(vec![("f", FpmValue::Flag(false)), ("force", FpmValue::Flag(false))]),
            strings(&["fpm"])
        );
    }

    #[test]
    fn test_scalar_value() {
        assert_eq!(
            build(vec![
                ("t", FpmValue::Scalar("deb".into())),
                ("version", FpmValue::Scalar("1.0".into())),
            ]),
            strings(&["fpm", "-t", "deb", "--version", "1.0"])
        );
    }

    #[test]
    fn test_list_repeats_flag() {
        assert_eq!(
            build(vec![("depends", FpmValue::List(strings(&["v1", "v2"])))]),
            strings(&["fpm", "--depends", "v1", "--depends", "v2"])
        );
    }

    #[test]
    fn test_template_value_map() {
        assert_eq!(
            build(vec![(
                "template-value",
                FpmValue::Map(map(&[("user", "app"), ("port", "80")]))
            )]),
            strings(&["fpm", "--template-value", "user=app", "--template-value", "port=80"])
        );
    }

    #[test]
    fn test_deb_field_map() {
        assert_eq!(
            build(vec![("deb-field", FpmValue::Map(map(&[("Bugs", "none")])))]),
            strings(&["fpm", "--deb-field", "Bugs: none"])
        );
    }

    #[test]
    fn test_arguments_come_after_all_flags() {
        assert_eq!(
            build(vec![
                ("_arguments", FpmValue::List(strings(&["src/=/opt/app", "extra"]))),
                ("s", FpmValue::Scalar("dir".into())),
                ("depends", FpmValue::List(strings(&["libc"]))),
            ]),
            strings(&["fpm", "-s", "dir", "--depends", "libc", "src/=/opt/app", "extra"])
        );
    }

    #[test]
    fn test_arguments_map_becomes_positional_pairs() {
        assert_eq!(
            build(vec![
                ("_arguments", FpmValue::Map(map(&[("build/", "/opt/app"), ("etc/", "/etc")]))),
                ("t", FpmValue::Scalar("rpm".into())),
            ]),
            strings(&["fpm", "-t", "rpm", "build/=/opt/app", "etc/=/etc"])
        );
    }

    #[test]
    fn test_unknown_map_is_ignored_and_reported() {
        let command = build_command(
            &options(vec![
                ("rpm-tag", FpmValue::Map(map(&[("a", "b")]))),
                ("t", FpmValue::Scalar("rpm".into())),
            ]),
            &IndexMap::new(),
        );
        assert_eq!(command.args, strings(&["fpm", "-t", "rpm"]));
        assert_eq!(command.ignored, strings(&["rpm-tag"]));
    }

    #[test]
    fn test_output_is_deterministic() {
        let opts = options(vec![
            ("n", FpmValue::Scalar("app".into())),
            ("_arguments", FpmValue::List(strings(&["a"]))),
            ("depends", FpmValue::List(strings(&["x", "y"]))),
            ("f", FpmValue::Flag(true)),
        ]);
        let env = map(&[("VERSION", "1")]);
        assert_eq!(build_command(&opts, &env), build_command(&opts, &env));
    }

    #[test]
    fn test_environment_substitution() {
        let command = build_command(
            &options(vec![
                ("v", FpmValue::Scalar("$VERSION".into())),
                ("n", FpmValue::Scalar("${NAME}-bin".into())),
                ("_arguments", FpmValue::List(strings(&["$SRC=/opt/${NAME}"]))),
            ]),
            &map(&[("VERSION", "1.2.3"), ("NAME", "app"), ("SRC", "build/")]),
        );
        assert_eq!(
            command.args,
            strings(&["fpm", "-v", "1.2.3", "-n", "app-bin", "build/=/opt/app"])
        );
    }

    #[test]
    fn test_no_environment_leaves_tokens_unchanged() {
        assert_eq!(
            build(vec![("v", FpmValue::Scalar("$VERSION".into()))]),
            strings(&["fpm", "-v", "$VERSION"])
        );
    }

    #[test]
    fn test_unknown_variables_are_kept() {
        let env = map(&[("A", "1")]);
        assert_eq!(substitute_variables("$A-$B-${C}", &env), "1-$B-${C}");
        assert_eq!(substitute_variables("cost: 5$", &env), "cost: 5$");
    }
}
