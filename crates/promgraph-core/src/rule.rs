//! Loaded rule model.

use std::collections::BTreeMap;

use strum_macros::{Display, EnumIter, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RuleKind {
    Recording,
    Alerting,
}

/// One recording or alerting rule, as declared in a rule file.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    /// `record` or `alert` value exactly as written.
    pub declared_name: String,
    pub expr: String,
    pub for_duration: Option<String>,
    pub keep_firing_for: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl Rule {
    pub fn recording(record: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::new(RuleKind::Recording, record, expr)
    }

    pub fn alerting(alert: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::new(RuleKind::Alerting, alert, expr)
    }

    fn new(kind: RuleKind, name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            kind,
            declared_name: name.into(),
            expr: expr.into(),
            for_duration: None,
            keep_firing_for: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Canonical node name: the declared name up to the first `{`.
    pub fn name(&self) -> &str {
        match self.declared_name.find('{') {
            Some(idx) => &self.declared_name[..idx],
            None => &self.declared_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleGroup {
    pub name: String,
    pub interval: Option<String>,
    pub limit: Option<u64>,
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_canonical_name_strips_selector_suffix() {
        assert_eq!(Rule::recording("job:up:sum", "up").name(), "job:up:sum");
        assert_eq!(
            Rule::recording(r#"job:up:sum{env="prod"}"#, "up").name(),
            "job:up:sum"
        );
        assert_eq!(Rule::alerting("{odd}", "up").name(), "");
    }

    #[test]
    fn test_kind() {
        assert_eq!(Rule::alerting("HighLoad", "load > 1").kind, RuleKind::Alerting);
        assert_eq!(Rule::recording("load:avg", "avg(load)").kind, RuleKind::Recording);
        assert_eq!(RuleKind::Recording.to_string(), "recording");
    }
}
