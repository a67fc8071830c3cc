//! Buildpack `manifest.yml`
//!
//! Lists every installable dependency version with its download location
//! and checksum, plus a default version per dependency name.

use crate::config::load_yaml;
use crate::dependency::version::VersionManifest;
use crate::error::BuildpackResult;
use serde::Deserialize;
use std::path::Path;

/// Parsed `manifest.yml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildpackManifest {
    pub language: String,
    pub default_versions: Vec<DefaultVersion>,
    pub dependencies: Vec<ManifestDependency>,

    /// Stack the build runs on; entries for other stacks are invisible
    #[serde(skip)]
    stack: Option<String>,
}

/// `default_versions` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultVersion {
    pub name: String,
    pub version: String,
}

/// `dependencies` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestDependency {
    pub name: String,
    pub version: String,
    pub uri: String,
    pub sha256: String,
    pub cf_stacks: Vec<String>,
}

impl ManifestDependency {
    fn supports(&self, stack: Option<&str>) -> bool {
        match stack {
            Some(stack) if !self.cf_stacks.is_empty() => self.cf_stacks.iter().any(|s| s == stack),
            _ => true,
        }
    }
}

impl BuildpackManifest {
    /// Load `manifest.yml` from the buildpack directory
    pub async fn load(buildpack_dir: &Path) -> BuildpackResult<Self> {
        load_yaml(&buildpack_dir.join("manifest.yml")).await
    }

    /// Restrict the manifest to entries usable on `stack`
    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack.filter(|s| !s.is_empty());
        self
    }

    /// Find the entry for an exact dependency version
    pub fn entry(&self, name: &str, version: &str) -> Option<&ManifestDependency> {
        self.visible()
            .find(|d| d.name == name && d.version == version)
    }

    fn visible(&self) -> impl Iterator<Item = &ManifestDependency> {
        let stack = self.stack.as_deref();
        self.dependencies.iter().filter(move |d| d.supports(stack))
    }
}

impl VersionManifest for BuildpackManifest {
    fn all_versions(&self, name: &str) -> Vec<String> {
        self.visible()
            .filter(|d| d.name == name)
            .map(|d| d.version.clone())
            .collect()
    }

    fn default_version(&self, name: &str) -> Option<String> {
        self.default_versions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_yaml;
    use crate::dependency::version::resolve_version;

    const MANIFEST: &str = r#"
language: kibana
default_versions:
  - name: kibana
    version: 6.2.x
dependencies:
  - name: kibana
    version: 6.2.1
    uri: https://example.com/kibana-6.2.1.tar.gz
    sha256: aaaa
    cf_stacks: [cflinuxfs2]
  - name: kibana
    version: 6.2.2
    uri: https://example.com/kibana-6.2.2.tar.gz
    sha256: bbbb
    cf_stacks: [cflinuxfs3]
  - name: jq
    version: 1.5.0
    uri: https://example.com/jq-1.5.0.tgz
    sha256: cccc
"#;

    fn manifest() -> BuildpackManifest {
        parse_yaml(MANIFEST, Path::new("manifest.yml")).unwrap()
    }

    #[test]
    fn lists_versions_and_defaults() {
        let m = manifest();
        assert_eq!(m.all_versions("kibana"), vec!["6.2.1", "6.2.2"]);
        assert_eq!(m.default_version("kibana").as_deref(), Some("6.2.x"));
        assert!(m.default_version("jq").is_none());
    }

    #[test]
    fn stack_filter_hides_other_stacks() {
        let m = manifest().with_stack(Some("cflinuxfs2".to_string()));
        assert_eq!(m.all_versions("kibana"), vec!["6.2.1"]);
        // entries without stacks stay visible
        assert_eq!(m.all_versions("jq"), vec!["1.5.0"]);
        assert!(m.entry("kibana", "6.2.2").is_none());
    }

    #[test]
    fn default_version_is_expanded() {
        let m = manifest();
        assert_eq!(resolve_version(&m, "kibana", "", 3).unwrap(), "6.2.2");
    }

    #[test]
    fn entry_lookup() {
        let m = manifest();
        let entry = m.entry("jq", "1.5.0").unwrap();
        assert_eq!(entry.sha256, "cccc");
        assert!(m.entry("jq", "1.6.0").is_none());
    }
}
