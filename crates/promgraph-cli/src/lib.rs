//! promgraph command-line interface.
//!
pub mod discovery;
pub mod output;

use std::time::Instant;

use tracing::info;

use promgraph_core::{build_rule_graph, load_all};
use promgraph_error::Result;

pub use discovery::discover_files;
pub use output::{STDOUT_DESIGNATOR, emit_graph, open_sink};

/// Options for running promgraph.
#[derive(Debug, Clone)]
pub struct PromgraphOptions {
    /// Rule file paths or glob patterns.
    pub inputs: Vec<String>,
    /// Output file, or `-` for stdout.
    pub output: String,
}

impl Default for PromgraphOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: STDOUT_DESIGNATOR.to_string(),
        }
    }
}

/// Main entry point: discover, load, build, render.
///
/// Nothing is written when any rule file fails to load.
pub fn run_main(opts: &PromgraphOptions) -> Result<()> {
    let start = Instant::now();

    let files = discover_files(&opts.inputs)?;
    let groups = load_all(&files).map_err(|errs| errs.into_error())?;
    let graph = build_rule_graph(&groups)?;
    emit_graph(&graph, &opts.output)?;

    info!(
        files = files.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        secs = start.elapsed().as_secs_f64(),
        "complete"
    );
    Ok(())
}
