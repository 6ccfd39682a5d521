//! Two-pass construction of a [`RuleGraph`] from rule groups.
//!
//! The first pass declares every rule so that `ALERTS{alertname=...}`
//! references can resolve alerts declared later in the input. The second
//! pass parses each expression and records its edges.

use tracing::{debug, info};

use promgraph_error::{Error, Result};
use promgraph_promql::parse_expr;

use crate::extract::DependencyExtractor;
use crate::graph::{NodeType, RuleGraph};
use crate::rule::{Rule, RuleGroup};

#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: RuleGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the dependency graph of all rules in `groups`.
    pub fn build(mut self, groups: &[RuleGroup]) -> Result<RuleGraph> {
        for rule in rules(groups) {
            self.graph.declare(rule.name(), NodeType::from(rule.kind));
        }
        debug!(nodes = self.graph.node_count(), "declared rule nodes");

        for rule in rules(groups) {
            self.add_rule_edges(rule)?;
        }

        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "rule graph built"
        );
        Ok(self.graph)
    }

    fn add_rule_edges(&mut self, rule: &Rule) -> Result<()> {
        let expr = parse_expr(&rule.expr).map_err(|err| {
            Error::parse_failed(err.message())
                .with_operation("graph::add_rule_edges")
                .with_context("rule", rule.name())
                .with_context("expr", rule.expr.clone())
                .set_source(err)
        })?;

        let successors = DependencyExtractor::new(&self.graph).extract(&expr);
        let from = rule.name();
        for next in successors {
            self.graph.add_edge(from, &next);
        }
        Ok(())
    }
}

fn rules(groups: &[RuleGroup]) -> impl Iterator<Item = &Rule> {
    groups.iter().flat_map(|group| group.rules.iter())
}

/// Convenience wrapper around [`GraphBuilder::build`].
pub fn build_rule_graph(groups: &[RuleGroup]) -> Result<RuleGraph> {
    GraphBuilder::new().build(groups)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use promgraph_error::ErrorKind;

    use super::*;

    fn edges(graph: &RuleGraph) -> Vec<String> {
        graph
            .edges()
            .map(|edge| format!("{} -> {}", edge.from, edge.to))
            .collect()
    }

    #[test]
    fn test_recording_and_alert_chain() {
        let groups = vec![
            RuleGroup::new("ok").with_rule(Rule::recording("test:rule:sum", "up")),
            RuleGroup::new("alerts").with_rule(Rule::alerting(
                "TestAlert",
                r#"ALERTS{alertname="test:rule:sum"}"#,
            )),
        ];
        let graph = build_rule_graph(&groups).unwrap();

        // test:rule:sum is a recording rule, so ALERTS does not resolve to it.
        assert_eq!(edges(&graph), vec!["test:rule:sum -> up"]);
        assert_eq!(graph.node_type("up"), Some(NodeType::Unknown));
        assert_eq!(graph.node_type("TestAlert"), Some(NodeType::Alerted));
    }

    #[test]
    fn test_alert_referencing_later_alert() {
        let groups = vec![RuleGroup::new("g")
            .with_rule(Rule::alerting("Meta", r#"count(ALERTS{alertname=~"Disk.+"}) > 2"#))
            .with_rule(Rule::alerting("DiskFull", "disk:usage:ratio > 0.9"))
            .with_rule(Rule::recording("disk:usage:ratio", "1 - node_free / node_size"))];
        let graph = build_rule_graph(&groups).unwrap();

        assert_eq!(
            edges(&graph),
            vec![
                "DiskFull -> disk:usage:ratio",
                "Meta -> DiskFull",
                "disk:usage:ratio -> node_free",
                "disk:usage:ratio -> node_size",
            ]
        );
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn test_edge_endpoints_are_nodes() {
        let groups = vec![RuleGroup::new("g")
            .with_rule(Rule::alerting("Meta", r#"ALERTS{alertname!="Meta"} unless on() absent(up)"#))
            .with_rule(Rule::alerting("Slow", "histogram_quantile(0.9, rate(lat_bucket[5m])) > 1"))
            .with_rule(Rule::recording("ratio", "sum(errors) / sum(requests offset 1h)"))];
        let graph = build_rule_graph(&groups).unwrap();

        assert_eq!(graph.edge_count(), 5);
        for edge in graph.edges() {
            assert!(graph.node_type(&edge.from).is_some(), "{edge:?}");
            assert!(graph.node_type(&edge.to).is_some(), "{edge:?}");
        }
        assert_eq!(graph.node_type("Slow"), Some(NodeType::Alerted));
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let groups = vec![RuleGroup::new("g").with_rule(Rule::recording("r", "a + a * a"))];
        let graph = build_rule_graph(&groups).unwrap();
        assert_eq!(edges(&graph), vec!["r -> a"]);
    }

    #[test]
    fn test_canonical_names_are_used() {
        let groups = vec![RuleGroup::new("g")
            .with_rule(Rule::recording(r#"x:y{env="prod"}"#, "up"))
            .with_rule(Rule::recording("z", "x:y"))];
        let graph = build_rule_graph(&groups).unwrap();
        assert_eq!(edges(&graph), vec!["x:y -> up", "z -> x:y"]);
        assert_eq!(graph.node_type("x:y"), Some(NodeType::Recorded));
    }

    #[test]
    fn test_self_reference() {
        let groups = vec![RuleGroup::new("g").with_rule(Rule::recording("r", "r offset 1h"))];
        let graph = build_rule_graph(&groups).unwrap();
        assert_eq!(edges(&graph), vec!["r -> r"]);
        assert_eq!(graph.node_type("r"), Some(NodeType::Recorded));
    }

    #[test]
    fn test_empty_input() {
        let graph = build_rule_graph(&[]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unparsable_expression_is_fatal() {
        let groups = vec![RuleGroup::new("g").with_rule(Rule::recording("bad", "sum("))];
        let err = build_rule_graph(&groups).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert_eq!(err.context_value("rule"), Some("bad"));
        assert_eq!(err.operation(), "graph::add_rule_edges");
    }
}
