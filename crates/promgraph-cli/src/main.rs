use std::process::ExitCode;

use clap::Parser;

use promgraph_cli::{PromgraphOptions, STDOUT_DESIGNATOR, run_main};
use promgraph_error::Result;

#[derive(Parser, Debug)]
#[command(
    name = "promgraph",
    about = "promgraph: draw the dependency graph of Prometheus rules",
    version
)]
pub struct Cli {
    /// Rule files to read; glob patterns are expanded
    #[arg(value_name = "RULE_FILES", required = true, num_args = 1..)]
    rule_files: Vec<String>,

    /// Output file ('-' for stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = STDOUT_DESIGNATOR)]
    output: String,
}

pub fn run(args: Cli) -> Result<()> {
    // Initialize tracing subscriber for logging
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let opts = PromgraphOptions {
        inputs: args.rule_files,
        output: args.output,
    };
    run_main(&opts)
}

pub fn main() -> ExitCode {
    let args = Cli::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "execution failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
