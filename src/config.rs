//! # Configuration File
//!
//! Package declarations are read from a YAML file (`packsync.yaml` by
//! default). The file is loaded into raw [`serde_yaml::Value`]s and checked
//! field by field, so a mistake is reported against the package and field it
//! occurs in rather than as a generic deserialization failure.
//!
//! ```yaml
//! base_dir: ~/.local/share/packsync
//! url_format: "https://github.com/{}.git"
//! sync_timeout: 300
//! packages:
//!   - owner/a
//!   - id: owner/b
//!     as: b-local
//!     branch: dev
//!     requires: [owner/a]
//!     config: "make"
//!   - group:
//!       pin: true
//!       packages: [owner/c]
//! ```
//!
//! Every key is optional. Bare strings are shorthand for `{ id: <string> }`.
//! Hook fields (`setup`, `config`, `load`) take a shell command or a list of
//! them, run with the package clone as working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_yaml::{Mapping, Value};

use crate::defaults;
use crate::error::{Error, Result};
use crate::graph::DEFAULT_URL_FORMAT;
use crate::hooks::{Hook, HookStage};
use crate::spec::{Entry, Group, Spec};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "packsync.yaml";

/// Engine settings that are not package declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding one clone per package.
    pub base_dir: PathBuf,
    /// Remote URL template; `{}` is replaced by the package identity.
    pub url_format: String,
    /// Upper bound for a single package's sync, if any.
    pub sync_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: defaults::default_base_dir(),
            url_format: DEFAULT_URL_FORMAT.to_string(),
            sync_timeout: None,
        }
    }
}

/// A parsed configuration file.
#[derive(Debug, Default)]
pub struct Config {
    pub settings: Settings,
    pub entries: Vec<Entry>,
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Read and parse the configuration file at `path`.
pub fn from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Parse a configuration document.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let root: Value = serde_yaml::from_str(yaml_content)?;
    let map = match root {
        Value::Null => return Ok(Config::default()),
        Value::Mapping(map) => map,
        _ => {
            return Err(Error::ConfigParse {
                message: "top level must be a mapping".to_string(),
                hint: Some("Start the file with 'packages:'".to_string()),
            })
        }
    };

    let mut config = Config::default();
    for (key, value) in map {
        let key = key_str(&key, "configuration")?;
        match key.as_str() {
            "base_dir" => {
                let dir = expect_string("configuration", &key, value)?;
                config.settings.base_dir = expand_tilde(&dir);
            }
            "url_format" => {
                let format = expect_string("configuration", &key, value)?;
                if !format.contains("{}") {
                    return Err(Error::ConfigParse {
                        message: format!("url_format '{}' has no '{{}}' placeholder", format),
                        hint: Some("Use e.g. 'https://github.com/{}.git'".to_string()),
                    });
                }
                config.settings.url_format = format;
            }
            "sync_timeout" => {
                let seconds = value.as_u64().filter(|s| *s > 0).ok_or_else(|| {
                    Error::ConfigParse {
                        message: "sync_timeout must be a positive number of seconds".to_string(),
                        hint: None,
                    }
                })?;
                config.settings.sync_timeout = Some(Duration::from_secs(seconds));
            }
            "packages" => config.entries = parse_entries(value)?,
            other => {
                return Err(Error::ConfigParse {
                    message: format!("unknown key '{}'", other),
                    hint: Some(
                        "Known keys are base_dir, url_format, sync_timeout and packages"
                            .to_string(),
                    ),
                })
            }
        }
    }
    Ok(config)
}

fn key_str(key: &Value, spec: &str) -> Result<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::SpecValidation {
            spec: spec.to_string(),
            field: format!("{:?}", key),
            message: "keys must be strings".to_string(),
        })
}

fn type_error(spec: &str, field: &str, expected: &str) -> Error {
    Error::SpecValidation {
        spec: spec.to_string(),
        field: field.to_string(),
        message: format!("must be {}", expected),
    }
}

fn expect_string(spec: &str, field: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(type_error(spec, field, "a string")),
    }
}

fn expect_bool(spec: &str, field: &str, value: Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| type_error(spec, field, "true or false"))
}

fn expect_sequence(spec: &str, field: &str, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Sequence(seq) => Ok(seq),
        Value::Null => Ok(Vec::new()),
        _ => Err(type_error(spec, field, "a list")),
    }
}

fn parse_entries(value: Value) -> Result<Vec<Entry>> {
    expect_sequence("configuration", "packages", value)?
        .into_iter()
        .map(parse_entry)
        .collect()
}

fn parse_entry(value: Value) -> Result<Entry> {
    if let Value::Mapping(map) = &value {
        if map.contains_key("group") {
            return parse_group(map.clone());
        }
    }
    parse_spec(value).map(Entry::Package)
}

fn parse_group(map: Mapping) -> Result<Entry> {
    if map.len() != 1 {
        return Err(Error::SpecValidation {
            spec: "group".to_string(),
            field: "group".to_string(),
            message: "must be the only key of its entry".to_string(),
        });
    }

    let body = match map.into_iter().next().map(|(_, v)| v) {
        Some(Value::Mapping(body)) => body,
        _ => return Err(type_error("group", "group", "a mapping")),
    };

    let mut group = Group {
        pin: None,
        disable: None,
        entries: Vec::new(),
    };
    for (key, value) in body {
        let key = key_str(&key, "group")?;
        match key.as_str() {
            "pin" => group.pin = Some(expect_bool("group", &key, value)?),
            "disable" => group.disable = Some(expect_bool("group", &key, value)?),
            "packages" => {
                group.entries = expect_sequence("group", &key, value)?
                    .into_iter()
                    .map(parse_entry)
                    .collect::<Result<_>>()?
            }
            other => {
                return Err(Error::SpecValidation {
                    spec: "group".to_string(),
                    field: other.to_string(),
                    message: "is not a known field".to_string(),
                })
            }
        }
    }
    Ok(Entry::Group(group))
}

/// Parse one package declaration: a bare identity or a mapping.
pub fn parse_spec(value: Value) -> Result<Spec> {
    let map = match value {
        Value::String(id) => return Ok(Spec::new(id)),
        Value::Mapping(map) => map,
        _ => {
            return Err(Error::SpecValidation {
                spec: "package".to_string(),
                field: "id".to_string(),
                message: "a package must be an identity string or a mapping".to_string(),
            })
        }
    };

    let id = match map.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(_) => return Err(type_error("package", "id", "a string")),
        None => {
            return Err(Error::SpecValidation {
                spec: "package".to_string(),
                field: "id".to_string(),
                message: "is required".to_string(),
            })
        }
    };

    let mut spec = Spec::new(id.clone());
    for (key, value) in map {
        let key = key_str(&key, &id)?;
        match key.as_str() {
            "id" => {}
            "as" => spec = spec.name(expect_string(&id, &key, value)?),
            "url" => spec = spec.url(expect_string(&id, &key, value)?),
            "branch" => spec = spec.branch(expect_string(&id, &key, value)?),
            "pin" => spec = spec.pin(expect_bool(&id, &key, value)?),
            "disable" => spec = spec.disable(expect_bool(&id, &key, value)?),
            "requires" => {
                for dep in expect_sequence(&id, &key, value)? {
                    spec = spec.requires(parse_spec(dep)?);
                }
            }
            "wants" => {
                for dep in expect_sequence(&id, &key, value)? {
                    spec = spec.wants(parse_spec(dep)?);
                }
            }
            "setup" | "config" | "load" => {
                let stage = match key.as_str() {
                    "setup" => HookStage::Setup,
                    "config" => HookStage::Configure,
                    _ => HookStage::Load,
                };
                for command in parse_commands(&id, &key, value)? {
                    spec = spec.hook(stage, Hook::command(command));
                }
            }
            other => {
                return Err(Error::SpecValidation {
                    spec: id.clone(),
                    field: other.to_string(),
                    message: "is not a known field".to_string(),
                })
            }
        }
    }
    Ok(spec)
}

fn parse_commands(spec: &str, field: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::String(cmd) => Ok(vec![cmd]),
        Value::Null => Ok(Vec::new()),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|v| expect_string(spec, field, v))
            .collect(),
        _ => Err(type_error(spec, field, "a command or a list of commands")),
    }
}
