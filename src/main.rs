//! Kibana buildpack
//!
//! CLI entry point that dispatches to the build steps.

use clap::Parser;
use console::style;
use kibana_buildpack::cli::commands::{self, buildpack_dir};
use kibana_buildpack::cli::{Cli, Commands};
use kibana_buildpack::error::BuildpackResult;
use kibana_buildpack::logging;
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildpackResult<()> {
    let cli = Cli::parse();

    // 0-1 = info (build output), 2+ or BP_DEBUG = debug
    let debug = cli.verbose >= 2 || std::env::var_os("BP_DEBUG").is_some_and(|v| !v.is_empty());
    let log = logging::init(debug, cli.log_format);

    let buildpack_dir = buildpack_dir(cli.buildpack_dir)?;
    debug!("Buildpack dir: {}", buildpack_dir.display());

    match cli.command {
        Commands::Supply(args) => commands::supply(args, &buildpack_dir, log).await,
        Commands::Finalize(args) => commands::finalize(args, &buildpack_dir).await,
    }
}
