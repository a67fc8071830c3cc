//! Plugin source resolution
//!
//! Searches, first match wins:
//! 1. the staged `x-pack` bundle
//! 2. the staged `kibana-plugins` bundle
//! 3. `{build_dir}/plugins/`
//! 4. the network, by plugin name

use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Where a local plugin candidate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Offline bundle installed as the `x-pack` dependency
    XPack,
    /// Offline bundle installed as the `kibana-plugins` dependency
    KibanaPlugins,
    /// `plugins/` directory shipped with the application
    User,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPack => write!(f, "x-pack bundle"),
            Self::KibanaPlugins => write!(f, "kibana-plugins bundle"),
            Self::User => write!(f, "application plugins"),
        }
    }
}

/// A directory that may hold plugin artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSource {
    pub kind: SourceKind,
    pub dir: PathBuf,
}

impl PluginSource {
    pub fn new(kind: SourceKind, dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            dir: dir.into(),
        }
    }
}

/// The artifact chosen for a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginArtifact {
    /// File or directory found in a local source
    Local { kind: SourceKind, path: PathBuf },
    /// Installed by name from the network
    Network(String),
}

impl PluginArtifact {
    /// Argument for `kibana-plugin install`.
    ///
    /// Zip archives that are not HTTP(S) URLs get a `file://` prefix.
    pub fn install_reference(&self) -> String {
        let raw = match self {
            Self::Local { path, .. } => path.to_string_lossy().into_owned(),
            Self::Network(name) => name.clone(),
        };
        let is_http = raw.starts_with("http://") || raw.starts_with("https://");
        if raw.ends_with(".zip") && !is_http {
            format!("file://{raw}")
        } else {
            raw
        }
    }
}

/// Pick the artifact for `plugin` from `sources`, highest priority first
pub async fn resolve_source(plugin: &str, sources: &[PluginSource]) -> PluginArtifact {
    for source in sources {
        if let Some(entry) = find_candidate(plugin, &source.dir).await {
            debug!("Plugin {} found in {}: {}", plugin, source.kind, entry);
            return PluginArtifact::Local {
                kind: source.kind,
                path: source.dir.join(entry),
            };
        }
    }

    debug!("Plugin {} not found locally, installing from network", plugin);
    PluginArtifact::Network(plugin.to_string())
}

/// First entry of `dir`, in lexical order, whose name starts with `plugin`
async fn find_candidate(plugin: &str, dir: &Path) -> Option<String> {
    let mut names = list_entries(dir).await;
    names.sort();
    names.into_iter().find(|name| name.starts_with(plugin))
}

/// Entry names of `dir`; an unreadable directory has none
async fn list_entries(dir: &Path) -> Vec<String> {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return vec![];
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names
}
