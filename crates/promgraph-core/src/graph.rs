//! Rule dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::collections::btree_map::Entry;

use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::rule::RuleKind;

/// Classification of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    /// Produced by a recording rule.
    Recorded,
    /// Name of an alerting rule.
    Alerted,
    /// Referenced by some expression but declared by no rule.
    Unknown,
}

impl From<RuleKind> for NodeType {
    fn from(kind: RuleKind) -> Self {
        match kind {
            RuleKind::Recording => NodeType::Recorded,
            RuleKind::Alerting => NodeType::Alerted,
        }
    }
}

/// `from`'s expression references `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Nodes keyed by name and a set of edges. Every edge endpoint is a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleGraph {
    nodes: BTreeMap<String, NodeType>,
    edges: BTreeSet<Edge>,
}

impl RuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule node; a later declaration of the same name wins.
    pub fn declare(&mut self, name: impl Into<String>, node_type: NodeType) {
        self.nodes.insert(name.into(), node_type);
    }

    /// Insert `from -> to`, adding `to` as [`NodeType::Unknown`] when unseen.
    ///
    /// Returns `false` when the edge was already present.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        if let Entry::Vacant(entry) = self.nodes.entry(to.to_string()) {
            entry.insert(NodeType::Unknown);
        }
        if let Entry::Vacant(entry) = self.nodes.entry(from.to_string()) {
            entry.insert(NodeType::Unknown);
        }
        self.edges.insert(Edge::new(from, to))
    }

    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.nodes.get(name).copied()
    }

    /// Nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeType)> {
        self.nodes.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Names of nodes with the given type, in name order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &str> {
        self.nodes()
            .filter(move |(_, ty)| *ty == node_type)
            .map(|(name, _)| name)
    }

    /// Edges ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_edge_adds_unknown_target() {
        let mut graph = RuleGraph::new();
        graph.declare("job:up:sum", NodeType::Recorded);
        assert!(graph.add_edge("job:up:sum", "up"));
        assert!(!graph.add_edge("job:up:sum", "up"));

        assert_eq!(graph.node_type("up"), Some(NodeType::Unknown));
        assert_eq!(graph.node_type("job:up:sum"), Some(NodeType::Recorded));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edge_keeps_declared_types() {
        let mut graph = RuleGraph::new();
        graph.declare("A", NodeType::Alerted);
        graph.declare("r", NodeType::Recorded);
        graph.add_edge("A", "r");
        assert_eq!(graph.node_type("r"), Some(NodeType::Recorded));
        assert_eq!(graph.nodes_of_type(NodeType::Unknown).count(), 0);
    }

    #[test]
    fn test_later_declaration_wins() {
        let mut graph = RuleGraph::new();
        graph.declare("x", NodeType::Recorded);
        graph.declare("x", NodeType::Alerted);
        assert_eq!(graph.node_type("x"), Some(NodeType::Alerted));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut graph = RuleGraph::new();
        graph.add_edge("b", "z");
        graph.add_edge("a", "y");
        graph.add_edge("b", "c");

        let names: Vec<_> = graph.nodes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b", "c", "y", "z"]);

        let edges: Vec<_> = graph
            .edges()
            .map(|e| format!("{}->{}", e.from, e.to))
            .collect();
        assert_eq!(edges, vec!["a->y", "b->c", "b->z"]);
    }
}
