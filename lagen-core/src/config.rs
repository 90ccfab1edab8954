//! Configuration model - `.lagen/main.yml`

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// Location of the configuration file, relative to the project directory.
pub const CONFIG_PATH: &str = ".lagen/main.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "type")]
    pub mode: InstallMode,
    /// Project directory the entries are generated into.
    #[serde(skip)]
    pub cwd: PathBuf,
}

/// Whether lagen itself is installed globally or per project.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Local,
    Global,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// A list of names/`{name, command}` items, or a `name: command` mapping.
    #[serde(default, deserialize_with = "script_list")]
    pub scripts: Vec<ScriptSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    /// Manifest build script; the Makefile `build` rule is unaffected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty() || !self.dev_dependencies.is_empty()
    }
}

/// A named Makefile target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub use_environment: bool,
    #[serde(default = "default_true")]
    pub phony: bool,
    /// Narrows `use_environment` exports to these keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl RuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prerules: None,
            command: None,
            use_environment: false,
            phony: true,
            exports: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_prerules<I, S>(mut self, prerules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerules = Some(prerules.into_iter().map(Into::into).collect());
        self
    }

    pub fn using_environment(mut self) -> Self {
        self.use_environment = true;
        self
    }
}

/// A script is either a bare name (`pm run <name>`) or carries its own command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScriptSpec {
    Name(String),
    Command { name: String, command: String },
}

impl ScriptSpec {
    pub fn name(&self) -> &str {
        match self {
            ScriptSpec::Name(name) => name,
            ScriptSpec::Command { name, .. } => name,
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            ScriptSpec::Name(_) => None,
            ScriptSpec::Command { command, .. } => Some(command),
        }
    }
}

impl GlobalConfig {
    /// Load `<project>/.lagen/main.yml` and attach the project directory.
    pub fn load(project: &Path) -> Result<Self, ConfigError> {
        if !project.is_dir() {
            return Err(ConfigError::NotADirectory(project.to_path_buf()));
        }

        let path = project.join(CONFIG_PATH);
        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let mut config = Self::from_yaml(&content)
            .map_err(|source| ConfigError::Parse { path, source })?;
        config.check_unique_names()?;
        config.cwd = project.to_path_buf();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn check_unique_names(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateEntry(entry.name.clone()));
            }
        }
        Ok(())
    }

    /// Directory an entry is generated into.
    pub fn entry_dir(&self, entry: &Entry) -> PathBuf {
        self.cwd.join(&entry.name)
    }
}

fn script_list<'de, D>(deserializer: D) -> Result<Vec<ScriptSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(vec![]),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(name, command)| match (name, command) {
                (Value::String(name), Value::String(command)) => {
                    Ok(ScriptSpec::Command { name, command })
                }
                (name, command) => Err(D::Error::custom(format!(
                    "script {name:?} must map a name to a command string, got {command:?}"
                ))),
            })
            .collect(),
        sequence @ Value::Sequence(_) => {
            serde_yaml::from_value(sequence).map_err(D::Error::custom)
        }
        other => Err(D::Error::custom(format!(
            "scripts must be a list or a mapping, got {other:?}"
        ))),
    }
}

/// Accepts numbers and booleans as environment values.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(D::Error::custom(format!(
                        "environment value for {key} must be a scalar, got {other:?}"
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
