//! Tracing subscriber setup
//!
//! Build output is the buildpack's user interface, so info is always shown.
//! The filter sits behind a reload layer: the `Kibana` file can raise it to
//! debug after the subscriber is installed.

use clap::ValueEnum;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const INFO_FILTER: &str = "kibana_buildpack=info";
const DEBUG_FILTER: &str = "kibana_buildpack=debug";

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Handle for adjusting the level of an installed subscriber
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Switch to debug output for the rest of the process
    pub fn enable_debug(&self) {
        if let Err(e) = self.handle.modify(|filter| *filter = EnvFilter::new(DEBUG_FILTER)) {
            warn!("Could not enable debug logging: {}", e);
        }
    }
}

/// Install the global subscriber.
///
/// `debug` is set by `-vv` or by `BP_DEBUG` in the environment.
pub fn init(debug: bool, format: LogFormat) -> LogHandle {
    let filter = EnvFilter::new(if debug { DEBUG_FILTER } else { INFO_FILTER });
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).without_time())
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    LogHandle { handle }
}
