//! Buildpack build steps
//!
//! `supply` stages Kibana and everything it needs into the dep dir;
//! `finalize` writes the start script and release information.

pub mod finalize;
pub mod profile;
pub mod stager;
pub mod supply;

pub use finalize::Finalizer;
pub use stager::Stager;
pub use supply::{StagedTools, Supplier, SupplyReport, ToolFactory};
