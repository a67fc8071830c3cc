//! Named, versioned dependencies staged into the build
//!
//! A dependency is resolved against the buildpack manifest, claimed in the
//! dependency cache and handed to an artifact installer that places it in
//! the staging directory.

pub mod fetch;
pub mod installer;
pub mod manifest;
pub mod version;

pub use fetch::ManifestInstaller;
pub use installer::{ArtifactInstaller, DependencyInstaller};
pub use manifest::BuildpackManifest;
pub use version::{resolve_version, VersionManifest};

use std::path::PathBuf;

/// Fixed roots a dependency directory is placed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRoots {
    /// Root as seen at application run time, relative to `$DEPS_DIR`
    pub runtime: PathBuf,
    /// Root as seen during the build (the dep dir)
    pub staging: PathBuf,
}

/// A dependency resolved to a concrete version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Version as configured, empty when the manifest default was used
    pub requested_version: String,
    /// Concrete version from the manifest
    pub version: String,
    /// Number of version segments the dependency requires
    pub version_parts: usize,
    /// `<name>-<version>`; also the cache key
    pub dir_name: String,
    pub runtime_location: PathBuf,
    pub staging_location: PathBuf,
}

impl Dependency {
    /// Build a resolved dependency and derive its locations from `roots`
    pub fn new(
        name: &str,
        requested_version: &str,
        version: &str,
        version_parts: usize,
        roots: &DependencyRoots,
    ) -> Self {
        let dir_name = format!("{name}-{version}");
        Self {
            name: name.to_string(),
            requested_version: requested_version.to_string(),
            version: version.to_string(),
            version_parts,
            runtime_location: roots.runtime.join(&dir_name),
            staging_location: roots.staging.join(&dir_name),
            dir_name,
        }
    }
}
