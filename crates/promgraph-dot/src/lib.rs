//! Graphviz rendering of rule dependency graphs.
//!
//! Output layout:
//!
//! ```text
//! digraph {
//!   "job:up:sum" [shape=oval]
//!   JobDown [shape=doubleoctagon]
//!   up [shape=rect]
//!
//!   "job:up:sum" -> up
//!   JobDown -> "job:up:sum"
//! }
//! ```
//!
//! Nodes come first, then a blank line, then edges; both sorted.

mod dot;

use std::io;

use promgraph_core::{NodeType, RuleGraph};

pub use dot::{DotBuilder, escape_id, is_bare_id, quote_id};

/// Map a node type to its DOT shape.
pub fn shape_for_type(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Recorded => "oval",
        NodeType::Alerted => "doubleoctagon",
        NodeType::Unknown => "rect",
    }
}

/// Render `graph` as DOT text.
pub fn render_graph(graph: &RuleGraph) -> String {
    let mut dot = DotBuilder::new();
    for (name, node_type) in graph.nodes() {
        dot.node(name, &[("shape", shape_for_type(node_type))]);
    }
    dot.blank();
    for edge in graph.edges() {
        dot.edge(&edge.from, &edge.to);
    }
    dot.build()
}

/// Render `graph` and write it to `out`.
pub fn write_graph<W: io::Write + ?Sized>(graph: &RuleGraph, out: &mut W) -> io::Result<()> {
    let rendered = render_graph(graph);
    tracing::debug!(bytes = rendered.len(), "writing dot graph");
    out.write_all(rendered.as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_graph() -> RuleGraph {
        let mut graph = RuleGraph::new();
        graph.declare("test:rule:sum", NodeType::Recorded);
        graph.declare("TestAlert", NodeType::Alerted);
        graph.add_edge("test:rule:sum", "up");
        graph.add_edge("TestAlert", "test:rule:sum");
        graph
    }

    #[test]
    fn test_render_graph() {
        let expected = "\
digraph {
  TestAlert [shape=doubleoctagon]
  \"test:rule:sum\" [shape=oval]
  up [shape=rect]

  TestAlert -> \"test:rule:sum\"
  \"test:rule:sum\" -> up
}
";
        assert_eq!(render_graph(&sample_graph()), expected);
    }

    #[test]
    fn test_render_is_repeatable() {
        let graph = sample_graph();
        let first = render_graph(&graph);
        assert_eq!(render_graph(&graph), first);
    }

    #[test]
    fn test_render_empty_graph() {
        assert_eq!(render_graph(&RuleGraph::new()), "digraph {\n\n}\n");
    }

    #[test]
    fn test_write_graph_matches_render() {
        let graph = sample_graph();
        let mut out = Vec::new();
        write_graph(&graph, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), render_graph(&graph));
    }

    #[test]
    fn test_write_graph_propagates_sink_errors() {
        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_graph(&sample_graph(), &mut Broken).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
