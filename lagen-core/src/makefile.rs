//! Makefile Serializer
//!
//! Renders a [`MakefileModel`] to text. Output depends only on the model and
//! its insertion order, so regenerating from the same configuration is
//! byte-identical.

use crate::config::RuleSpec;
use crate::graph::{normalize_env_key, MakefileModel};

pub const HEADER: &str = "# This is an automatically generated Makefile, do not modify!\n\
                          # Edit your lagen configuration to regenerate it.\n\n";

const PHONY_SEPARATOR: &str = " \\\n\t\t";

pub fn render(model: &MakefileModel) -> String {
    let mut out = String::from(HEADER);

    if !model.environment().is_empty() {
        for (key, value) in model.environment() {
            out.push_str(&format!("{key}\t= {value}\n"));
        }
        out.push('\n');
    }

    let blocks: Vec<String> = model
        .rules()
        .iter()
        .map(|rule| render_rule(rule, model))
        .collect();
    out.push_str(&blocks.join("\n"));

    let phonies: Vec<&str> = model.phony_names().collect();
    out.push_str("\n.PHONY:\t");
    out.push_str(&phonies.join(PHONY_SEPARATOR));
    out
}

fn render_rule(rule: &RuleSpec, model: &MakefileModel) -> String {
    let mut out = match &rule.prerules {
        Some(prerules) => format!("{}:\t{}\n", rule.name, prerules.join(" ")),
        None => format!("{}:\n", rule.name),
    };

    if let Some(command) = &rule.command {
        out.push_str(&format!("\t@{}{}\n", env_exports(rule, model), command));
    }
    out
}

/// `KEY=$(KEY) ...` followed by a space, or nothing.
fn env_exports(rule: &RuleSpec, model: &MakefileModel) -> String {
    if !rule.use_environment || model.environment().is_empty() {
        return String::new();
    }

    let narrowed: Option<Vec<String>> = rule
        .exports
        .as_ref()
        .map(|keys| keys.iter().map(|k| normalize_env_key(k)).collect());

    let exports: Vec<String> = model
        .environment()
        .iter()
        .map(|(key, _)| key)
        .filter(|key| narrowed.as_ref().map_or(true, |keys| keys.contains(key)))
        .map(|key| format!("{key}=$({key})"))
        .collect();

    if exports.is_empty() {
        String::new()
    } else {
        format!("{} ", exports.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Entry, RuleSpec};
    use crate::graph::build_graph;
    use crate::kinds::LambdaKind;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_rules_verbatim() {
        let mut model = MakefileModel::new();
        model.insert_rule(RuleSpec::new("all").with_prerules(["install"]));
        model.insert_rule(RuleSpec::new("install").with_command("A"));
        model.insert_rule(RuleSpec::new("build").with_command("B"));

        let expected = format!(
            "{HEADER}all:\tinstall\n\ninstall:\n\t@A\n\nbuild:\n\t@B\n\n.PHONY:\tall \\\n\t\tinstall \\\n\t\tbuild"
        );
        assert_eq!(render(&model), expected);
    }

    #[test]
    fn test_render_environment_block() {
        let mut model = MakefileModel::new();
        model.insert_env("DB_PASS", "x");
        model.insert_env("REGION", "eu-west-1");
        model.insert_rule(RuleSpec::new("all"));

        let text = render(&model);
        assert!(text.starts_with(&format!(
            "{HEADER}DB_PASS\t= x\nREGION\t= eu-west-1\n\nall:\n"
        )));
    }

    #[test]
    fn test_use_environment_exports() {
        let mut model = MakefileModel::new();
        model.insert_env("DB_PASS", "x");
        model.insert_rule(RuleSpec::new("apply").with_command("apply-command").using_environment());

        assert!(render(&model).contains("apply:\n\t@DB_PASS=$(DB_PASS) apply-command\n"));
    }

    #[test]
    fn test_exports_cover_whole_environment_by_default() {
        let mut model = MakefileModel::new();
        model.insert_env("A", "1");
        model.insert_env("B", "2");
        model.insert_rule(RuleSpec::new("plan").with_command("terraform plan").using_environment());

        assert!(render(&model).contains("\t@A=$(A) B=$(B) terraform plan\n"));
    }

    #[test]
    fn test_exports_narrowed_per_rule() {
        let mut model = MakefileModel::new();
        model.insert_env("DB_PASS", "x");
        model.insert_env("REGION", "r");
        let mut rule = RuleSpec::new("plan").with_command("terraform plan").using_environment();
        rule.exports = Some(vec!["region".into()]);
        model.insert_rule(rule);

        assert!(render(&model).contains("\t@REGION=$(REGION) terraform plan\n"));
    }

    #[test]
    fn test_no_exports_without_environment() {
        let mut model = MakefileModel::new();
        model.insert_rule(RuleSpec::new("apply").with_command("terraform apply").using_environment());
        assert!(render(&model).contains("\t@terraform apply\n"));
    }

    #[test]
    fn test_no_exports_without_use_environment() {
        let mut model = MakefileModel::new();
        model.insert_env("DB_PASS", "x");
        model.insert_rule(RuleSpec::new("init").with_command("terraform init"));
        assert!(render(&model).contains("\t@terraform init\n"));
    }

    #[test]
    fn test_non_phony_rule_left_off_phony_line() {
        let mut model = MakefileModel::new();
        model.insert_rule(RuleSpec::new("all").with_prerules(["dist.zip"]));
        let mut zip = RuleSpec::new("dist.zip").with_command("zip -r dist.zip src");
        zip.phony = false;
        model.insert_rule(zip);

        assert!(render(&model).ends_with("\n.PHONY:\tall"));
    }

    #[test]
    fn test_full_entry_render_is_deterministic() {
        let mut entry = Entry::new("api", "node");
        entry.environment = vec!["db-pass".into()];
        let env = BTreeMap::from([("db-pass".to_string(), "x".to_string())]);

        let first = render(&build_graph(&entry, LambdaKind::Node, &env).unwrap());
        let second = render(&build_graph(&entry, LambdaKind::Node, &env).unwrap());
        assert_eq!(first, second);
        assert!(first.contains("plan:\n\t@DB_PASS=$(DB_PASS) terraform plan\n"));
        assert!(first.contains("deploy:\tbuild apply\n"));
    }
}
