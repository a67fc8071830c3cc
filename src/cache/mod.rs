//! Dependency cache across builds
//!
//! Installed dependency archives are kept in `<cache>/dependencies/<name>-<version>`
//! so the next build can reuse them. Only one version per dependency is kept.
//!
//! # Entry States
//!
//! | State | Description |
//! |-------|-------------|
//! | Unreferenced | Found at build start, not claimed yet |
//! | InUse | Claimed by a dependency installed in this build |
//! | Deleted | Evicted or swept during this build |

pub mod entry;
pub mod store;

pub use entry::{is_version_of, CacheEntry, CacheState};
pub use store::{CacheReport, DependencyCache, DEPENDENCIES_DIR};
