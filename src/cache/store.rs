//! Per-build dependency cache bookkeeping
//!
//! The cache keeps at most one version of each dependency. Entries found at
//! build start are unreferenced until an install claims them; whatever is
//! still unreferenced when the build ends is swept.

use crate::cache::entry::{is_version_of, CacheEntry, CacheState};
use crate::error::{BuildpackError, BuildpackResult};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Name of the dependency cache below the build cache directory
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Outcome of an eviction or sweep
#[derive(Debug, Default)]
pub struct CacheReport {
    /// Directory names removed from disk
    pub removed: Vec<String>,
    /// Removals that failed; logged, never fatal
    pub failures: Vec<BuildpackError>,
}

impl CacheReport {
    fn merge(&mut self, other: CacheReport) {
        self.removed.extend(other.removed);
        self.failures.extend(other.failures);
    }
}

/// Tracks the cached dependency directories of one build
#[derive(Debug)]
pub struct DependencyCache {
    cache_dir: PathBuf,
    dependencies_dir: PathBuf,
    no_cache: bool,
    entries: BTreeMap<String, CacheState>,
}

impl DependencyCache {
    /// Create a cache rooted at the build cache directory
    pub fn new(cache_dir: impl Into<PathBuf>, no_cache: bool) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            dependencies_dir: cache_dir.join(DEPENDENCIES_DIR),
            cache_dir,
            no_cache,
            entries: BTreeMap::new(),
        }
    }

    /// Directory holding one slot per cached dependency version
    pub fn dependencies_dir(&self) -> &Path {
        &self.dependencies_dir
    }

    /// Cache slot for a dependency directory name
    pub fn slot_path(&self, dir_name: &str) -> PathBuf {
        self.dependencies_dir.join(dir_name)
    }

    /// Whether the build bypasses the cache
    pub fn is_no_cache(&self) -> bool {
        self.no_cache
    }

    /// Current state of an entry
    pub fn state(&self, dir_name: &str) -> Option<CacheState> {
        self.entries.get(dir_name).copied()
    }

    /// Snapshot of all entries, ordered by directory name
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries
            .iter()
            .map(|(dir_name, state)| CacheEntry {
                dir_name: dir_name.clone(),
                state: *state,
            })
            .collect()
    }

    /// Scan the cache once at build start.
    ///
    /// In no-cache mode the whole build cache directory is emptied first.
    pub async fn reconcile(&mut self) -> BuildpackResult<Vec<CacheEntry>> {
        if self.no_cache {
            debug!("Cleaning build cache {}", self.cache_dir.display());
            log_failures(&remove_contents(&self.cache_dir).await);
        }

        fs::create_dir_all(&self.dependencies_dir).await.map_err(|e| {
            BuildpackError::io(
                format!("creating cache directory {}", self.dependencies_dir.display()),
                e,
            )
        })?;

        let mut dir = fs::read_dir(&self.dependencies_dir).await.map_err(|e| {
            BuildpackError::io(
                format!("reading cache directory {}", self.dependencies_dir.display()),
                e,
            )
        })?;

        self.entries.clear();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| BuildpackError::io("reading cache directory entry", e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!("Found cached dependency '{}'", name);
            self.entries.insert(name, CacheState::Unreferenced);
        }

        Ok(self.entries())
    }

    /// Claim `dir_name` for dependency `name`, evicting every other cached
    /// version of the same dependency. Calling it again is a no-op.
    pub async fn mark_in_use(&mut self, name: &str, dir_name: &str) -> CacheReport {
        let siblings: Vec<String> = self
            .entries
            .iter()
            .filter(|(entry, state)| {
                entry.as_str() != dir_name && state.is_present() && is_version_of(entry, name)
            })
            .map(|(entry, _)| entry.clone())
            .collect();

        let mut report = CacheReport::default();
        for sibling in siblings {
            debug!("Deleting unused version '{}' from application cache", sibling);
            report.merge(self.remove_entry(&sibling).await);
        }

        self.entries.insert(dir_name.to_string(), CacheState::InUse);
        log_failures(&report);
        report
    }

    /// Drop a freshly written slot again (no-cache mode)
    pub async fn discard(&mut self, dir_name: &str) -> CacheReport {
        let report = self.remove_entry(dir_name).await;
        log_failures(&report);
        report
    }

    /// Remove every entry nobody claimed during this build
    pub async fn sweep(&mut self) -> CacheReport {
        let orphans: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, state)| **state == CacheState::Unreferenced)
            .map(|(entry, _)| entry.clone())
            .collect();

        let mut report = CacheReport::default();
        for orphan in orphans {
            debug!("Deleting unused dependency '{}' from application cache", orphan);
            report.merge(self.remove_entry(&orphan).await);
        }

        log_failures(&report);
        report
    }

    async fn remove_entry(&mut self, dir_name: &str) -> CacheReport {
        let path = self.slot_path(dir_name);
        let mut report = CacheReport::default();

        match remove_path(&path).await {
            Ok(()) => {
                self.entries.insert(dir_name.to_string(), CacheState::Deleted);
                report.removed.push(dir_name.to_string());
            }
            Err(source) => report
                .failures
                .push(BuildpackError::CacheIoFailure { path, source }),
        }
        report
    }
}

fn log_failures(report: &CacheReport) {
    for failure in &report.failures {
        warn!("{}", failure);
    }
}

/// Remove a file or directory tree; a missing path counts as removed
async fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove everything inside `dir`, keeping `dir` itself.
/// A failed entry is reported and the rest are still removed.
async fn remove_contents(dir: &Path) -> CacheReport {
    let mut report = CacheReport::default();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return report,
        Err(source) => {
            report.failures.push(BuildpackError::CacheIoFailure {
                path: dir.to_path_buf(),
                source,
            });
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                report.failures.push(BuildpackError::CacheIoFailure {
                    path: dir.to_path_buf(),
                    source,
                });
                break;
            }
        };
        let path = entry.path();
        match remove_path(&path).await {
            Ok(()) => report
                .removed
                .push(entry.file_name().to_string_lossy().into_owned()),
            Err(source) => report
                .failures
                .push(BuildpackError::CacheIoFailure { path, source }),
        }
    }
    report
}
