//! Kibana buildpack
//!
//! Stages Kibana for a platform build: resolves dependency versions against
//! the buildpack manifest, keeps one cached version per dependency, binds
//! configuration templates to bound services and installs Kibana plugins
//! from the best available source.

pub mod cache;
pub mod certificates;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod environment;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod stage;
pub mod template;

pub use error::{BuildpackError, BuildpackResult};
