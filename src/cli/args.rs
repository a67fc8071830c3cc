//! CLI argument definitions using clap derive

use crate::logging::LogFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Kibana buildpack
///
/// Stages Kibana, its plugins and its configuration templates during a
/// platform build.
#[derive(Parser, Debug)]
#[command(name = "kibana-buildpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Build step to run
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Buildpack root holding manifest.yml and defaults/ (defaults to the
    /// parent of the executable's directory)
    #[arg(long, global = true, env = "BUILDPACK_DIR")]
    pub buildpack_dir: Option<PathBuf>,
}

/// Available build steps
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install Kibana, tools, templates and plugins into the dep dir
    Supply(StageArgs),

    /// Write the start script and release information
    Finalize(StageArgs),
}

/// Directories passed to every build step
#[derive(Parser, Debug)]
pub struct StageArgs {
    /// Application directory
    pub build_dir: PathBuf,

    /// Build cache directory, kept between builds
    pub cache_dir: PathBuf,

    /// Directory holding one dep dir per buildpack
    pub deps_dir: PathBuf,

    /// Index of this buildpack's dep dir
    pub deps_idx: String,
}
