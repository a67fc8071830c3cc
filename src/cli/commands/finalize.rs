//! Finalize command - write the start script and release information

use crate::cli::args::StageArgs;
use crate::error::BuildpackResult;
use crate::stage::{Finalizer, Stager};
use console::style;
use std::path::Path;

/// Execute the finalize command
pub async fn execute(args: StageArgs, buildpack_dir: &Path) -> BuildpackResult<()> {
    let stager = Stager::new(
        args.build_dir,
        args.cache_dir,
        args.deps_dir,
        args.deps_idx,
        buildpack_dir,
    );

    let finalizer = Finalizer::new(stager, std::env::temp_dir()).await?;
    finalizer.run().await?;

    println!(
        "{} Start command {} ready for Kibana {}",
        style("-----> ").bold(),
        style(crate::stage::finalize::START_SCRIPT).cyan(),
        finalizer.kibana_version()
    );
    Ok(())
}
