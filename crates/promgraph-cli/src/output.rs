//! Output sink selection and DOT emission.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use tracing::info;

use promgraph_core::RuleGraph;
use promgraph_dot::write_graph;
use promgraph_error::{Error, Result};

/// Designator meaning standard output.
pub const STDOUT_DESIGNATOR: &str = "-";

/// Open the sink named by `designator`: `-` is stdout, anything else is a
/// file that is created or truncated.
pub fn open_sink(designator: &str) -> Result<Box<dyn Write>> {
    if designator == STDOUT_DESIGNATOR {
        return Ok(Box::new(io::stdout().lock()));
    }

    let file = File::create(designator).map_err(|err| {
        Error::from(err)
            .with_operation("output::open_sink")
            .with_context("path", designator)
    })?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Render `graph` into the sink named by `designator`.
pub fn emit_graph(graph: &RuleGraph, designator: &str) -> Result<()> {
    let mut sink = open_sink(designator)?;
    write_graph(graph, &mut *sink).map_err(|err| {
        Error::from(err)
            .with_operation("output::emit_graph")
            .with_context("path", designator)
    })?;
    if designator != STDOUT_DESIGNATOR {
        info!(path = designator, "output written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use promgraph_core::NodeType;
    use promgraph_error::ErrorKind;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_emit_to_file_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.dot");
        fs::write(&path, "stale content that is longer than the graph").unwrap();

        let mut graph = RuleGraph::new();
        graph.declare("r", NodeType::Recorded);
        emit_graph(&graph, &path.to_string_lossy()).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "digraph {\n  r [shape=oval]\n\n}\n"
        );
    }

    #[test]
    fn test_unwritable_sink_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/graph.dot");
        let err = emit_graph(&RuleGraph::new(), &path.to_string_lossy()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "output::open_sink");
    }
}
