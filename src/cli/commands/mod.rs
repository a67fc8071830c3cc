//! CLI command implementations

pub mod finalize;
pub mod supply;

pub use finalize::execute as finalize;
pub use supply::execute as supply;

use crate::error::{BuildpackError, BuildpackResult};
use std::path::PathBuf;

/// Buildpack root: explicit value, else the parent of the directory holding
/// the running executable (`<buildpack>/bin/<step>`)
pub fn buildpack_dir(explicit: Option<PathBuf>) -> BuildpackResult<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let exe = std::env::current_exe()
        .map_err(|e| BuildpackError::io("locating the running executable", e))?;
    exe.parent()
        .and_then(|bin| bin.parent())
        .map(PathBuf::from)
        .ok_or_else(|| {
            BuildpackError::Internal(format!(
                "cannot derive buildpack directory from {}",
                exe.display()
            ))
        })
}
