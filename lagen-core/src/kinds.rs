//! Kind table - the closed set of deployable entry kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GenerateError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LambdaKind {
    Node,
    Go,
}

/// Per-kind command templates and package manager policy.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub install_command: &'static str,
    pub build_command: &'static str,
    /// `None` means the kind does not restrict the package manager.
    pub package_managers: Option<&'static [&'static str]>,
    pub default_package_manager: Option<&'static str>,
    pub has_manifest: bool,
}

/// Command template shared by every kind for derived script rules.
pub const SCRIPT_COMMAND: &str = "{{ pm }} run {{ script }}";

const NODE: KindSpec = KindSpec {
    install_command: "{{ pm }} install",
    build_command: "{{ pm }} run build",
    package_managers: Some(&["npm", "yarn"]),
    default_package_manager: Some("npm"),
    has_manifest: true,
};

const GO: KindSpec = KindSpec {
    install_command: "go mod tidy",
    build_command: "go build {{ name }}",
    package_managers: None,
    default_package_manager: None,
    has_manifest: false,
};

impl LambdaKind {
    pub const ALL: [LambdaKind; 2] = [LambdaKind::Node, LambdaKind::Go];

    pub fn spec(self) -> &'static KindSpec {
        match self {
            LambdaKind::Node => &NODE,
            LambdaKind::Go => &GO,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LambdaKind::Node => "node",
            LambdaKind::Go => "go",
        }
    }
}

impl fmt::Display for LambdaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LambdaKind {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LambdaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GenerateError::UnknownKind(s.to_string()))
    }
}
