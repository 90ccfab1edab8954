//! Command Resolver
//!
//! Turns the per-kind command templates into concrete shell commands for one
//! entry. Templates use `{{ key }}` placeholders; every placeholder a template
//! references is checked against a freshly built substitution table before
//! anything is substituted.

use std::collections::BTreeMap;

use crate::config::Entry;
use crate::error::ValidationError;
use crate::kinds::{LambdaKind, SCRIPT_COMMAND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

/// A parsed command template.
#[derive(Debug, Clone)]
pub struct CommandTemplate<'t> {
    segments: Vec<Segment<'t>>,
}

impl<'t> CommandTemplate<'t> {
    pub fn parse(source: &'t str) -> Self {
        let mut segments = vec![];
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(&rest[..open]));
            }
            let key = rest[open + 2..open + 2 + close].trim();
            segments.push(Segment::Placeholder(key));
            rest = &rest[open + 2 + close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Self { segments }
    }

    /// Placeholder keys referenced by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &'t str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(key) => Some(*key),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder, failing before any output is produced if
    /// one of them has no value.
    pub fn render(&self, entry: &str, table: &Substitutions<'_>) -> Result<String, ValidationError> {
        if let Some(missing) = self.placeholders().find(|key| table.get(key).is_none()) {
            return Err(ValidationError::UnresolvedPlaceholder {
                entry: entry.to_string(),
                placeholder: missing.to_string(),
            });
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => out.push_str(table.get(key).unwrap_or_default()),
            }
        }
        Ok(out)
    }
}

/// Values available to a template, built once per resolution.
#[derive(Debug, Clone)]
pub struct Substitutions<'e> {
    values: BTreeMap<&'static str, Option<&'e str>>,
}

impl<'e> Substitutions<'e> {
    pub fn new(entry: &'e Entry, package_manager: Option<&'e str>, script: Option<&'e str>) -> Self {
        let values = BTreeMap::from([
            ("pm", package_manager),
            ("name", Some(entry.name.as_str())),
            ("script", script),
        ]);
        Self { values }
    }

    /// Value for `key`, treating absent, unknown and empty values alike.
    pub fn get(&self, key: &str) -> Option<&'e str> {
        self.values
            .get(key)
            .copied()
            .flatten()
            .filter(|value| !value.is_empty())
    }
}

/// The package manager an entry resolves to, after defaults and validation.
pub fn package_manager(entry: &Entry, kind: LambdaKind) -> Result<Option<&str>, ValidationError> {
    let spec = kind.spec();
    let chosen = entry
        .package_manager
        .as_deref()
        .or(spec.default_package_manager);

    if let (Some(allowed), Some(found)) = (spec.package_managers, chosen) {
        if !allowed.contains(&found) {
            return Err(ValidationError::InvalidPackageManager {
                entry: entry.name.clone(),
                kind: kind.to_string(),
                found: found.to_string(),
                allowed: allowed.iter().map(|pm| pm.to_string()).collect(),
            });
        }
    }

    Ok(chosen)
}

pub fn resolve_install(entry: &Entry, kind: LambdaKind) -> Result<String, ValidationError> {
    resolve(entry, kind, kind.spec().install_command, None)
}

pub fn resolve_build(entry: &Entry, kind: LambdaKind) -> Result<String, ValidationError> {
    resolve(entry, kind, kind.spec().build_command, None)
}

/// Command for a derived script rule: `<pm> run <script>`.
pub fn resolve_script(entry: &Entry, kind: LambdaKind, script: &str) -> Result<String, ValidationError> {
    resolve(entry, kind, SCRIPT_COMMAND, Some(script))
}

fn resolve(
    entry: &Entry,
    kind: LambdaKind,
    template: &str,
    script: Option<&str>,
) -> Result<String, ValidationError> {
    let pm = package_manager(entry, kind)?;
    let table = Substitutions::new(entry, pm, script);
    CommandTemplate::parse(template).render(&entry.name, &table)
}
