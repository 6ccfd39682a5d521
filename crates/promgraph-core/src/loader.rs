//! Rule file loading.
//!
//! [`YamlRuleLoader`] reads the Prometheus rule file format:
//!
//! ```yaml
//! groups:
//!   - name: example
//!     rules:
//!       - record: job:up:sum
//!         expr: sum by (job) (up)
//!       - alert: JobDown
//!         expr: job:up:sum == 0
//!         for: 5m
//! ```
//!
//! Decoding rejects unknown fields. Every problem found while validating a
//! file is reported, not only the first one.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use promgraph_error::{CompoundError, Error};

use crate::rule::{Rule, RuleGroup, RuleKind};

static METRIC_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("metric name pattern is valid")
});

static LABEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("label name pattern is valid")
});

/// Source of rule groups for one file.
pub trait RuleFileLoader {
    /// Load every group of the file at `path`, in file order.
    ///
    /// On failure all problems found in the file are returned together.
    fn load(&self, path: &Path) -> Result<Vec<RuleGroup>, CompoundError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRuleLoader;

impl YamlRuleLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decode and validate rule file text. `origin` names the file in errors.
    pub fn parse_str(&self, origin: &str, content: &str) -> Result<Vec<RuleGroup>, CompoundError> {
        if is_blank_document(content) {
            debug!(file = origin, "rule file is empty");
            return Ok(Vec::new());
        }

        let file: RuleFileDoc = serde_yaml::from_str(content).map_err(|err| {
            let mut error = Error::deserialization_failed(err.to_string())
                .with_operation("rules::decode")
                .with_context("file", origin);
            if let Some(location) = err.location() {
                error = error.with_context("line", location.line().to_string());
            }
            error.set_source(err)
        })?;

        let mut errors = CompoundError::new();
        let mut seen_groups = HashSet::new();
        let mut groups = Vec::with_capacity(file.groups.len());

        for group in file.groups {
            let ctx = ErrorSite {
                file: origin,
                group: &group.name,
            };
            if group.name.is_empty() {
                errors.push(ctx.error("group name must not be empty"));
            } else if !seen_groups.insert(group.name.clone()) {
                errors.push(ctx.error(format!(
                    "groupname: {:?} is repeated in the same file",
                    group.name
                )));
            }
            errors.accumulate(validate_group(&ctx, &group));

            let mut rules = Vec::with_capacity(group.rules.len());
            for (index, rule) in group.rules.iter().enumerate() {
                match validate_rule(&ctx, index, rule) {
                    Ok(rule) => rules.push(rule),
                    Err(errs) => errors.accumulate(errs),
                }
            }

            groups.push(RuleGroup {
                name: group.name,
                interval: group.interval,
                limit: group.limit,
                rules,
            });
        }

        errors.into_result(groups)
    }
}

impl RuleFileLoader for YamlRuleLoader {
    fn load(&self, path: &Path) -> Result<Vec<RuleGroup>, CompoundError> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::from(err).with_context("file", origin.clone()))?;
        self.parse_str(&origin, &content)
    }
}

fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// Where a validation error was found.
struct ErrorSite<'a> {
    file: &'a str,
    group: &'a str,
}

impl ErrorSite<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::validation_failed(message)
            .with_operation("rules::validate")
            .with_context("file", self.file)
            .with_context("group", self.group)
    }

    fn rule_error(&self, index: usize, rule: &RuleDoc, message: impl Into<String>) -> Error {
        let name = rule.record.as_deref().or(rule.alert.as_deref()).unwrap_or("");
        self.error(message)
            .with_context("rule", format!("{} {:?}", index + 1, name))
    }
}

fn validate_group(ctx: &ErrorSite<'_>, group: &GroupDoc) -> Vec<Error> {
    let mut errors = Vec::new();
    for (field, value) in [
        ("interval", &group.interval),
        ("query_offset", &group.query_offset),
    ] {
        if let Some(value) = value
            && let Err(err) = promgraph_promql::parse_duration(value)
        {
            errors.push(ctx.error(format!("invalid field '{field}': {}", err.message())));
        }
    }
    for name in group.labels.keys() {
        if !LABEL_NAME_RE.is_match(name) {
            errors.push(ctx.error(format!("invalid label name: {name}")));
        }
    }
    errors
}

fn validate_rule(ctx: &ErrorSite<'_>, index: usize, rule: &RuleDoc) -> Result<Rule, Vec<Error>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ctx.rule_error(index, rule, message));

    let (kind, declared_name) = match (&rule.record, &rule.alert) {
        (Some(record), None) => (RuleKind::Recording, record.clone()),
        (None, Some(alert)) => (RuleKind::Alerting, alert.clone()),
        (Some(record), Some(_)) => {
            fail("only one of 'record' and 'alert' must be set".to_string());
            (RuleKind::Recording, record.clone())
        }
        (None, None) => {
            fail("one of 'record' or 'alert' must be set".to_string());
            (RuleKind::Recording, String::new())
        }
    };
    if declared_name.is_empty() && (rule.record.is_some() || rule.alert.is_some()) {
        // `record: ""` decodes as Some("").
        let field = if kind == RuleKind::Recording { "record" } else { "alert" };
        fail(format!("field '{field}' must not be empty"));
    }

    let expr = match &rule.expr {
        None => {
            fail("field 'expr' must be set in rule".to_string());
            String::new()
        }
        Some(value) => {
            let expr = value.to_string();
            if expr.trim().is_empty() {
                fail("field 'expr' must be set in rule".to_string());
            } else if let Err(err) = promgraph_promql::parse_expr(&expr) {
                fail(format!("could not parse expression: {}", err.message()));
            }
            expr
        }
    };

    if kind == RuleKind::Recording && rule.record.is_some() {
        if !declared_name.is_empty() && !METRIC_NAME_RE.is_match(&declared_name) {
            fail(format!("invalid recording rule name: {declared_name}"));
        }
        if rule.for_duration.is_some() {
            fail("invalid field 'for' in recording rule".to_string());
        }
        if rule.keep_firing_for.is_some() {
            fail("invalid field 'keep_firing_for' in recording rule".to_string());
        }
        if !rule.annotations.is_empty() {
            fail("invalid field 'annotations' in recording rule".to_string());
        }
    }

    for (field, value) in [
        ("for", &rule.for_duration),
        ("keep_firing_for", &rule.keep_firing_for),
    ] {
        if let Some(value) = value
            && let Err(err) = promgraph_promql::parse_duration(value)
        {
            fail(format!("invalid field '{field}': {}", err.message()));
        }
    }

    for name in rule.labels.keys() {
        if !LABEL_NAME_RE.is_match(name) {
            fail(format!("invalid label name: {name}"));
        }
    }
    for name in rule.annotations.keys() {
        if !LABEL_NAME_RE.is_match(name) {
            fail(format!("invalid annotation name: {name}"));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Rule {
        kind,
        declared_name,
        expr,
        for_duration: rule.for_duration.clone(),
        keep_firing_for: rule.keep_firing_for.clone(),
        labels: to_string_map(&rule.labels),
        annotations: to_string_map(&rule.annotations),
    })
}

fn to_string_map(map: &BTreeMap<String, Scalar>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFileDoc {
    #[serde(default)]
    groups: Vec<GroupDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupDoc {
    #[serde(default)]
    name: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    query_offset: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, Scalar>,
    #[serde(default)]
    rules: Vec<RuleDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDoc {
    #[serde(default)]
    record: Option<String>,
    #[serde(default)]
    alert: Option<String>,
    #[serde(default)]
    expr: Option<Scalar>,
    #[serde(default, rename = "for")]
    for_duration: Option<String>,
    #[serde(default)]
    keep_firing_for: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, Scalar>,
    #[serde(default)]
    annotations: BTreeMap<String, Scalar>,
}

/// A YAML scalar read as text. `expr: 1` and `severity: 2` are both legal;
/// an empty value (`summary:`) reads as the empty string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Null(()),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(value) => f.write_str(value),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Null(()) => Ok(()),
        }
    }
}
