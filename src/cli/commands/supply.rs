//! Supply command - stage Kibana into the dep dir

use crate::cli::args::StageArgs;
use crate::dependency::{BuildpackManifest, ManifestInstaller, VersionManifest};
use crate::environment::Environment;
use crate::error::BuildpackResult;
use crate::logging::LogHandle;
use crate::stage::{StagedTools, Stager, Supplier};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Execute the supply command
pub async fn execute(args: StageArgs, buildpack_dir: &Path, log: LogHandle) -> BuildpackResult<()> {
    let stager = Stager::new(
        args.build_dir,
        args.cache_dir,
        args.deps_dir,
        args.deps_idx,
        buildpack_dir,
    );

    let stack = std::env::var("CF_STACK").ok().filter(|s| !s.is_empty());
    debug!("Stack: {}", stack.as_deref().unwrap_or("any"));
    let manifest = Arc::new(BuildpackManifest::load(buildpack_dir).await?.with_stack(stack));
    let versions: Arc<dyn VersionManifest> = manifest.clone();
    let environment = Environment::from_process_env()?;

    let report = Supplier::new(
        stager,
        environment,
        versions,
        Box::new(ManifestInstaller::new(manifest)),
        Box::new(StagedTools),
    )
    .with_log_handle(log)
    .run()
    .await?;

    for warning in &report.warnings {
        println!("{} {}", style("Warning:").yellow(), warning);
    }
    println!(
        "{} Kibana {} staged ({} template(s), {} plugin(s))",
        style("-----> ").bold(),
        style(&report.kibana_version).cyan(),
        report.templates.len(),
        report.plugins.len()
    );
    Ok(())
}
