//! Successor discovery for a single rule expression.

use promgraph_promql::{
    ALERTNAME_LABEL, ALERTS_METRIC, Expr, ExprVisitor, VectorSelector, walk_expr,
};
use tracing::trace;

use crate::graph::{NodeType, RuleGraph};

/// Collects the names an expression references.
///
/// A selector on the `ALERTS` series is resolved against the alert nodes
/// already declared in `graph`: every `alertname` matcher contributes the
/// alerts it matches, each matcher on its own. Any other named selector is
/// reported as is. Selectors without a metric name contribute nothing.
pub struct DependencyExtractor<'g> {
    graph: &'g RuleGraph,
    successors: Vec<String>,
}

impl<'g> DependencyExtractor<'g> {
    pub fn new(graph: &'g RuleGraph) -> Self {
        Self {
            graph,
            successors: Vec::new(),
        }
    }

    /// Successors of `expr` in discovery order. Duplicates are kept.
    pub fn extract(mut self, expr: &Expr) -> Vec<String> {
        walk_expr(&mut self, expr);
        self.successors
    }

    fn resolve_alerts(&mut self, selector: &VectorSelector) {
        let graph = self.graph;
        for matcher in selector.matchers_for(ALERTNAME_LABEL) {
            let matched = graph
                .nodes_of_type(NodeType::Alerted)
                .filter(|name| matcher.matches(name));
            let before = self.successors.len();
            self.successors.extend(matched.map(str::to_string));
            trace!(
                %matcher,
                matched = self.successors.len() - before,
                "resolved ALERTS matcher"
            );
        }
    }
}

impl<'e> ExprVisitor<'e> for DependencyExtractor<'_> {
    fn visit_vector_selector(&mut self, selector: &'e VectorSelector) {
        match selector.name() {
            Some(ALERTS_METRIC) => self.resolve_alerts(selector),
            Some(name) => self.successors.push(name.to_string()),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use promgraph_promql::parse_expr;

    use super::*;

    fn extract(graph: &RuleGraph, expr: &str) -> Vec<String> {
        let expr = parse_expr(expr).unwrap();
        DependencyExtractor::new(graph).extract(&expr)
    }

    fn alerts_graph() -> RuleGraph {
        let mut graph = RuleGraph::new();
        for name in ["DiskFull", "DiskSlow", "HostDown"] {
            graph.declare(name, NodeType::Alerted);
        }
        graph.declare("disk:usage:ratio", NodeType::Recorded);
        graph.add_edge("disk:usage:ratio", "DiskUnknown");
        graph
    }

    #[test]
    fn test_plain_selectors() {
        let graph = RuleGraph::new();
        assert_eq!(extract(&graph, "a+b"), vec!["a", "b"]);
        assert_eq!(extract(&graph, "max_over_time(a[1h]) > 3"), vec!["a"]);
        assert_eq!(extract(&graph, "a / a"), vec!["a", "a"]);
    }

    #[test]
    fn test_nested_expressions_are_traversed() {
        let graph = RuleGraph::new();
        assert_eq!(
            extract(
                &graph,
                "topk(k, -sum without (x) (rate(m1[5m] offset 1h))[1d:] @ end()) unless on(i) (m2)"
            ),
            vec!["k", "m1", "m2"]
        );
    }

    #[test]
    fn test_anonymous_selector_is_ignored() {
        let graph = RuleGraph::new();
        assert!(extract(&graph, r#"{job="node"} > 0"#).is_empty());
    }

    #[test]
    fn test_alerts_matcher_kinds() {
        let graph = alerts_graph();
        assert_eq!(
            extract(&graph, r#"ALERTS{alertname="DiskFull"}"#),
            vec!["DiskFull"]
        );
        assert_eq!(
            extract(&graph, r#"ALERTS{alertname!="DiskFull"}"#),
            vec!["DiskSlow", "HostDown"]
        );
        assert_eq!(
            extract(&graph, r#"ALERTS{alertname=~"Disk.*"}"#),
            vec!["DiskFull", "DiskSlow"]
        );
        assert_eq!(
            extract(&graph, r#"ALERTS{alertname!~"Disk.*"}"#),
            vec!["HostDown"]
        );
    }

    #[test]
    fn test_alerts_regex_is_anchored_and_ignores_other_types() {
        let graph = alerts_graph();
        assert!(extract(&graph, r#"ALERTS{alertname=~"Disk"}"#).is_empty());
        // DiskUnknown is only referenced, never declared as an alert.
        assert!(extract(&graph, r#"ALERTS{alertname="DiskUnknown"}"#).is_empty());
    }

    #[test]
    fn test_alerts_matchers_are_independent() {
        let graph = alerts_graph();
        assert_eq!(
            extract(
                &graph,
                r#"ALERTS{alertname=~"Disk.*", alertstate="firing", alertname="HostDown"}"#
            ),
            vec!["DiskFull", "DiskSlow", "HostDown"]
        );
        assert!(extract(&graph, r#"ALERTS{alertstate="firing"}"#).is_empty());
    }
}
