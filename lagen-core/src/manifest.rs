//! Manifest Builder - `package.json` for node entries

use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;

use crate::config::{Entry, GlobalConfig, InstallMode};

pub const MANIFEST_FILE: &str = "package.json";
pub const DEFAULT_VERSION: &str = "0.0.0-development";
pub const DEFAULT_MAIN: &str = "index.js";
pub const DEFAULT_BUILD_SCRIPT: &str =
    "echo \"No build command specified, using Terraform default zip\"";

/// Development dependency injected when lagen is installed globally.
pub const SELF_PACKAGE: (&str, &str) = ("@lucas-cox/lagen", "latest");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModel {
    pub name: String,
    pub author: String,
    pub version: String,
    pub main: String,
    pub scripts: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

pub fn build_manifest(entry: &Entry, config: &GlobalConfig) -> ManifestModel {
    let mut scripts = BTreeMap::from([(
        "build".to_string(),
        entry
            .build
            .clone()
            .unwrap_or_else(|| DEFAULT_BUILD_SCRIPT.to_string()),
    )]);
    for script in &entry.scripts {
        if let Some(command) = script.command() {
            scripts.insert(script.name().to_string(), command.to_string());
        }
    }

    let mut dev_dependencies = entry.dev_dependencies.clone();
    if config.mode == InstallMode::Global {
        let (package, version) = SELF_PACKAGE;
        dev_dependencies.insert(package.to_string(), version.to_string());
    }

    ManifestModel {
        name: entry.name.clone(),
        author: config.author.clone().unwrap_or_default(),
        version: entry
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        main: entry.main.clone().unwrap_or_else(|| DEFAULT_MAIN.to_string()),
        scripts,
        dependencies: entry.dependencies.clone(),
        dev_dependencies,
    }
}

/// Four-space indented JSON with a trailing newline.
pub fn render_manifest(manifest: &ManifestModel) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    manifest.serialize(&mut ser)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}
