//! Entry validation
//!
//! Rules either reject an entry outright or attach warnings to it.
//! Package manager, environment and placeholder checks live with the resolver
//! and graph builder; the rules here cover what those never look at.

use serde::Serialize;
use std::path::{Component, Path};

use crate::config::Entry;
use crate::error::ValidationError;
use crate::kinds::LambdaKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub rule: &'static str,
    pub message: String,
}

impl ValidationWarning {
    fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

pub trait EntryRule {
    fn name(&self) -> &'static str;
    fn check(&self, entry: &Entry, kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError>;
}

/// The name doubles as the entry's directory.
pub struct EntryNameRule;

impl EntryRule for EntryNameRule {
    fn name(&self) -> &'static str { "entry_name" }

    fn check(&self, entry: &Entry, _kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError> {
        let mut components = Path::new(&entry.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(vec![]),
            _ => Err(ValidationError::InvalidEntryName(entry.name.clone())),
        }
    }
}

pub struct VersionRule;

impl EntryRule for VersionRule {
    fn name(&self) -> &'static str { "version" }

    fn check(&self, entry: &Entry, _kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError> {
        if let Some(version) = &entry.version {
            semver::Version::parse(version).map_err(|e| ValidationError::InvalidVersion {
                entry: entry.name.clone(),
                version: version.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(vec![])
    }
}

/// Manifest fields on a kind without a manifest are dropped.
pub struct ManifestFieldsRule;

impl EntryRule for ManifestFieldsRule {
    fn name(&self) -> &'static str { "manifest_fields" }

    fn check(&self, entry: &Entry, kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError> {
        if kind.spec().has_manifest {
            return Ok(vec![]);
        }

        let ignored: Vec<&str> = [
            ("version", entry.version.is_some()),
            ("main", entry.main.is_some()),
            ("build", entry.build.is_some()),
            ("dependencies", !entry.dependencies.is_empty()),
            ("devDependencies", !entry.dev_dependencies.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect();

        if ignored.is_empty() {
            Ok(vec![])
        } else {
            Ok(vec![ValidationWarning::new(
                self.name(),
                format!("{kind} entries have no manifest, ignoring: {}", ignored.join(", ")),
            )])
        }
    }
}

/// Scripts are applied after explicit rules and silently replace them.
pub struct ScriptShadowRule;

impl EntryRule for ScriptShadowRule {
    fn name(&self) -> &'static str { "script_shadow" }

    fn check(&self, entry: &Entry, _kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError> {
        Ok(entry
            .scripts
            .iter()
            .filter(|script| entry.rules.iter().any(|rule| rule.name == script.name()))
            .map(|script| {
                ValidationWarning::new(
                    self.name(),
                    format!("script {} replaces the explicit rule of the same name", script.name()),
                )
            })
            .collect())
    }
}

pub struct Validator {
    rules: Vec<Box<dyn EntryRule + Send + Sync>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(EntryNameRule),
                Box::new(VersionRule),
                Box::new(ManifestFieldsRule),
                Box::new(ScriptShadowRule),
            ],
        }
    }

    /// Run every rule; the first rejection wins, warnings accumulate.
    pub fn validate(&self, entry: &Entry, kind: LambdaKind) -> Result<Vec<ValidationWarning>, ValidationError> {
        let mut warnings = vec![];
        for rule in &self.rules {
            warnings.extend(rule.check(entry, kind)?);
        }
        Ok(warnings)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
