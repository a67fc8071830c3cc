//! Build directories handed to a buildpack step

use crate::dependency::DependencyRoots;
use crate::error::{BuildpackError, BuildpackResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name recorded in `config.yml`
pub const BUILDPACK_NAME: &str = "kibana";

/// Directory of profile.d scripts below a dep dir
pub const PROFILE_D: &str = "profile.d";

/// Directories of one build, as passed on the command line
#[derive(Debug, Clone)]
pub struct Stager {
    build_dir: PathBuf,
    cache_dir: PathBuf,
    deps_dir: PathBuf,
    deps_idx: String,
    buildpack_dir: PathBuf,
}

#[derive(Serialize)]
struct ConfigYml<'a, T: Serialize> {
    name: &'a str,
    config: &'a T,
}

impl Stager {
    pub fn new(
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        deps_dir: impl Into<PathBuf>,
        deps_idx: impl Into<String>,
        buildpack_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
            deps_dir: deps_dir.into(),
            deps_idx: deps_idx.into(),
            buildpack_dir: buildpack_dir.into(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn deps_idx(&self) -> &str {
        &self.deps_idx
    }

    pub fn buildpack_dir(&self) -> &Path {
        &self.buildpack_dir
    }

    /// This buildpack's own directory below the deps dir
    pub fn dep_dir(&self) -> PathBuf {
        self.deps_dir.join(&self.deps_idx)
    }

    /// Roots dependencies are installed under
    pub fn dependency_roots(&self) -> DependencyRoots {
        DependencyRoots {
            runtime: PathBuf::from(&self.deps_idx),
            staging: self.dep_dir(),
        }
    }

    /// Create `name` below the dep dir
    pub async fn ensure_dep_subdir(&self, name: &str) -> BuildpackResult<PathBuf> {
        let dir = self.dep_dir().join(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| BuildpackError::io(format!("creating {}", dir.display()), e))?;
        Ok(dir)
    }

    /// Write `<dep_dir>/profile.d/<file_name>`
    pub async fn write_profile_d(&self, file_name: &str, content: &str) -> BuildpackResult<()> {
        let dir = self.ensure_dep_subdir(PROFILE_D).await?;
        let path = dir.join(file_name);
        debug!("Writing {}", path.display());
        fs::write(&path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", path.display()), e))
    }

    /// Write `<dep_dir>/config.yml` for later build steps
    pub async fn write_config_yml<T: Serialize>(&self, config: &T) -> BuildpackResult<()> {
        let content = serde_yaml::to_string(&ConfigYml {
            name: BUILDPACK_NAME,
            config,
        })?;
        let path = self.dep_dir().join("config.yml");
        fs::create_dir_all(self.dep_dir())
            .await
            .map_err(|e| BuildpackError::io(format!("creating {}", self.dep_dir().display()), e))?;
        fs::write(&path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn stager(temp: &TempDir) -> Stager {
        Stager::new(
            temp.path().join("build"),
            temp.path().join("cache"),
            temp.path().join("deps"),
            "0",
            temp.path().join("bp"),
        )
    }

    #[test]
    fn roots_follow_deps_idx() {
        let temp = TempDir::new().unwrap();
        let roots = stager(&temp).dependency_roots();
        assert_eq!(roots.runtime, PathBuf::from("0"));
        assert_eq!(roots.staging, temp.path().join("deps").join("0"));
    }

    #[tokio::test]
    async fn writes_profile_script() {
        let temp = TempDir::new().unwrap();
        let stager = stager(&temp);
        stager.write_profile_d("jq.sh", "export JQ_HOME=x\n").await.unwrap();

        let written = temp.path().join("deps/0/profile.d/jq.sh");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "export JQ_HOME=x\n");
    }

    #[tokio::test]
    async fn writes_config_yml() {
        let temp = TempDir::new().unwrap();
        let stager = stager(&temp);
        let config: BTreeMap<&str, &str> = [("KibanaVersion", "6.2.2")].into_iter().collect();
        stager.write_config_yml(&config).await.unwrap();

        let written: serde_yaml::Value = serde_yaml::from_str(
            &std::fs::read_to_string(temp.path().join("deps/0/config.yml")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["name"].as_str(), Some("kibana"));
        assert_eq!(written["config"]["KibanaVersion"].as_str(), Some("6.2.2"));
    }
}
