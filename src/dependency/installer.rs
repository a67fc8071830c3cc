//! Installs named dependencies, once per build, through the cache

use crate::cache::{CacheEntry, CacheReport, DependencyCache};
use crate::dependency::version::{resolve_version, VersionManifest};
use crate::dependency::{Dependency, DependencyRoots};
use crate::error::{BuildpackError, BuildpackResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Places a resolved dependency at its staging location
#[async_trait]
pub trait ArtifactInstaller: Send + Sync {
    /// Install `dependency` into `target`, reusing or filling `cache_slot`
    async fn install(
        &self,
        dependency: &Dependency,
        cache_slot: &Path,
        target: &Path,
    ) -> BuildpackResult<()>;
}

/// Resolves, caches and installs dependencies for one build
pub struct DependencyInstaller {
    manifest: Arc<dyn VersionManifest>,
    artifacts: Box<dyn ArtifactInstaller>,
    cache: DependencyCache,
    roots: DependencyRoots,
    installed: BTreeMap<String, Dependency>,
}

impl DependencyInstaller {
    pub fn new(
        manifest: Arc<dyn VersionManifest>,
        artifacts: Box<dyn ArtifactInstaller>,
        cache: DependencyCache,
        roots: DependencyRoots,
    ) -> Self {
        Self {
            manifest,
            artifacts,
            cache,
            roots,
            installed: BTreeMap::new(),
        }
    }

    /// The cache backing this build
    pub fn cache(&self) -> &DependencyCache {
        &self.cache
    }

    /// Dependency installed under `name` in this build, if any
    pub fn installed(&self, name: &str) -> Option<&Dependency> {
        self.installed.get(name)
    }

    /// Scan the cache at build start
    pub async fn reconcile_cache(&mut self) -> BuildpackResult<Vec<CacheEntry>> {
        self.cache.reconcile().await
    }

    /// Remove cache entries no install claimed
    pub async fn sweep_cache(&mut self) -> CacheReport {
        self.cache.sweep().await
    }

    /// Resolve a dependency version without installing it
    pub fn resolve(
        &self,
        name: &str,
        required_parts: usize,
        configured_version: &str,
    ) -> BuildpackResult<Dependency> {
        let version = resolve_version(
            self.manifest.as_ref(),
            name,
            configured_version,
            required_parts,
        )?;
        Ok(Dependency::new(
            name,
            configured_version,
            &version,
            required_parts,
            &self.roots,
        ))
    }

    /// Install a dependency. A dependency already installed in this build
    /// is returned as is.
    pub async fn install(
        &mut self,
        name: &str,
        required_parts: usize,
        configured_version: &str,
    ) -> BuildpackResult<Dependency> {
        if let Some(existing) = self.installed.get(name) {
            debug!("{} already installed as {}", name, existing.dir_name);
            return Ok(existing.clone());
        }

        let dependency = self.resolve(name, required_parts, configured_version)?;
        info!("-----> Installing {} {}", dependency.name, dependency.version);

        self.cache
            .mark_in_use(&dependency.name, &dependency.dir_name)
            .await;

        let slot = self.cache.slot_path(&dependency.dir_name);
        self.artifacts
            .install(&dependency, &slot, &dependency.staging_location)
            .await
            .map_err(|e| annotate(&dependency.name, e))?;

        if self.cache.is_no_cache() {
            self.cache.discard(&dependency.dir_name).await;
        }

        self.installed
            .insert(dependency.name.clone(), dependency.clone());
        Ok(dependency)
    }
}

/// Make sure an install error names the dependency
fn annotate(name: &str, err: BuildpackError) -> BuildpackError {
    match err {
        e @ (BuildpackError::InstallFailed { .. }
        | BuildpackError::ChecksumMismatch { .. }
        | BuildpackError::VersionNotFound { .. }) => e,
        other => BuildpackError::install_failed(name, other),
    }
}
