//! Rule Graph Builder
//!
//! Assembles the ordered rule set of one entry's Makefile: built-in defaults,
//! then the entry's explicit rules, then one derived rule per script. A later
//! rule with an existing name replaces the earlier one in place, so insertion
//! order is what the serializer renders.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::commands::{resolve_build, resolve_install, resolve_script};
use crate::config::{Entry, RuleSpec};
use crate::error::ValidationError;
use crate::kinds::LambdaKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MakefileModel {
    rules: Vec<RuleSpec>,
    environment: Vec<(String, String)>,
}

impl MakefileModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing a same-named one without moving it.
    pub fn insert_rule(&mut self, rule: RuleSpec) {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn insert_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.environment.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.environment.push((key, value)),
        }
    }

    pub fn rule(&self, name: &str) -> Option<&RuleSpec> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    /// Rule names that belong on the `.PHONY` line.
    pub fn phony_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter(|r| r.phony).map(|r| r.name.as_str())
    }

    fn check_prerules(&self, entry: &str) -> Result<(), ValidationError> {
        let names: HashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        for rule in &self.rules {
            for prerule in rule.prerules.iter().flatten() {
                if !names.contains(prerule.as_str()) {
                    return Err(ValidationError::UnknownPrerule {
                        entry: entry.to_string(),
                        rule: rule.name.clone(),
                        prerule: prerule.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// `db-pass` becomes `DB_PASS`.
pub fn normalize_env_key(key: &str) -> String {
    key.to_uppercase().replace('-', "_")
}

pub fn default_rules(install: String, build: String) -> Vec<RuleSpec> {
    vec![
        RuleSpec::new("all").with_prerules(["install"]),
        RuleSpec::new("install").with_command(install),
        RuleSpec::new("build").with_command(build),
        RuleSpec::new("init").with_command("terraform init"),
        RuleSpec::new("plan").with_command("terraform plan").using_environment(),
        RuleSpec::new("apply").with_command("terraform apply").using_environment(),
        RuleSpec::new("deploy").with_prerules(["build", "apply"]),
    ]
}

pub fn build_graph(
    entry: &Entry,
    kind: LambdaKind,
    global_env: &BTreeMap<String, String>,
) -> Result<MakefileModel, ValidationError> {
    let mut model = MakefileModel::new();

    for key in &entry.environment {
        let value = global_env
            .get(key)
            .ok_or_else(|| ValidationError::MissingEnvironmentKey {
                entry: entry.name.clone(),
                key: key.clone(),
            })?;
        model.insert_env(normalize_env_key(key), value.as_str());
    }

    let install = resolve_install(entry, kind)?;
    let build = resolve_build(entry, kind)?;
    for rule in default_rules(install, build) {
        model.insert_rule(rule);
    }

    for rule in &entry.rules {
        model.insert_rule(rule.clone());
    }

    // Scripts go last and win over defaults and explicit rules alike.
    for script in &entry.scripts {
        let command = resolve_script(entry, kind, script.name())?;
        model.insert_rule(RuleSpec::new(script.name()).with_command(command));
    }

    model.check_prerules(&entry.name)?;

    debug!(
        entry = %entry.name,
        rules = model.rules.len(),
        environment = model.environment.len(),
        "rule graph built"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScriptSpec;

    fn names(model: &MakefileModel) -> Vec<&str> {
        model.rules().iter().map(|r| r.name.as_str()).collect()
    }

    fn env() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("db-pass".to_string(), "x".to_string()),
            ("region".to_string(), "eu-west-1".to_string()),
        ])
    }

    #[test]
    fn test_default_rule_order() {
        let entry = Entry::new("api", "node");
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();
        assert_eq!(
            names(&model),
            ["all", "install", "build", "init", "plan", "apply", "deploy"]
        );
        assert_eq!(model.rule("install").unwrap().command.as_deref(), Some("npm install"));
        assert_eq!(
            model.rule("deploy").unwrap().prerules,
            Some(vec!["build".to_string(), "apply".to_string()])
        );
        assert!(model.rule("apply").unwrap().use_environment);
        assert!(model.environment().is_empty());
    }

    #[test]
    fn test_override_replaces_in_place() {
        let mut entry = Entry::new("api", "node");
        entry.rules = vec![RuleSpec::new("build").with_command("custom")];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();

        let build = model.rule("build").unwrap();
        assert_eq!(build.command.as_deref(), Some("custom"));
        assert_eq!(names(&model)[2], "build");
    }

    #[test]
    fn test_override_is_full_replacement() {
        let mut entry = Entry::new("api", "node");
        entry.rules = vec![RuleSpec::new("apply")];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();

        let apply = model.rule("apply").unwrap();
        assert!(apply.command.is_none());
        assert!(!apply.use_environment);
    }

    #[test]
    fn test_new_rules_are_appended() {
        let mut entry = Entry::new("api", "node");
        entry.rules = vec![RuleSpec::new("release").with_prerules(["deploy"])];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();
        assert_eq!(names(&model).last(), Some(&"release"));
    }

    #[test]
    fn test_scripts_override_explicit_rules() {
        let mut entry = Entry::new("api", "node");
        entry.package_manager = Some("yarn".into());
        entry.rules = vec![
            RuleSpec::new("test").with_command("explicit"),
            RuleSpec::new("build").with_command("custom"),
        ];
        entry.scripts = vec![
            ScriptSpec::Name("test".into()),
            ScriptSpec::Name("build".into()),
        ];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();

        assert_eq!(model.rule("test").unwrap().command.as_deref(), Some("yarn run test"));
        assert_eq!(model.rule("build").unwrap().command.as_deref(), Some("yarn run build"));
    }

    #[test]
    fn test_script_with_command_still_runs_through_package_manager() {
        let mut entry = Entry::new("api", "node");
        entry.scripts = vec![ScriptSpec::Command {
            name: "lint".into(),
            command: "eslint .".into(),
        }];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();
        assert_eq!(model.rule("lint").unwrap().command.as_deref(), Some("npm run lint"));
    }

    #[test]
    fn test_environment_normalized_in_declaration_order() {
        let mut entry = Entry::new("api", "node");
        entry.environment = vec!["region".into(), "db-pass".into()];
        let model = build_graph(&entry, LambdaKind::Node, &env()).unwrap();
        assert_eq!(
            model.environment(),
            [
                ("REGION".to_string(), "eu-west-1".to_string()),
                ("DB_PASS".to_string(), "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_environment_key() {
        let mut entry = Entry::new("api", "node");
        entry.environment = vec!["db-pass".into()];
        let err = build_graph(&entry, LambdaKind::Node, &BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingEnvironmentKey {
                entry: "api".into(),
                key: "db-pass".into(),
            }
        );
    }

    #[test]
    fn test_unknown_prerule_rejected() {
        let mut entry = Entry::new("api", "node");
        entry.rules = vec![RuleSpec::new("ship").with_prerules(["package"])];
        let err = build_graph(&entry, LambdaKind::Node, &env()).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownPrerule { ref prerule, .. } if prerule == "package"));
    }

    #[test]
    fn test_pure_label_rule_is_legal() {
        let mut entry = Entry::new("api", "node");
        entry.rules = vec![RuleSpec::new("noop")];
        assert!(build_graph(&entry, LambdaKind::Node, &env()).is_ok());
    }

    #[test]
    fn test_non_phony_rule_excluded_from_phony_names() {
        let mut model = MakefileModel::new();
        model.insert_rule(RuleSpec::new("all"));
        let mut artifact = RuleSpec::new("dist.zip").with_command("zip -r dist.zip .");
        artifact.phony = false;
        model.insert_rule(artifact);
        assert_eq!(model.phony_names().collect::<Vec<_>>(), ["all"]);
    }

    #[test]
    fn test_normalize_env_key() {
        assert_eq!(normalize_env_key("db-pass"), "DB_PASS");
        assert_eq!(normalize_env_key("Api_key"), "API_KEY");
    }
}
