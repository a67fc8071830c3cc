//! Configuration loading for a build
//!
//! Reads the application's `Kibana` file and the buildpack's template
//! catalogue. Both are YAML; an empty document yields the defaults.

pub mod schema;

pub use schema::{Alias, BuildpackSettings, ConfigTemplate, KibanaConfig, Template, TemplatesConfig};

use crate::error::{BuildpackError, BuildpackResult};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name of the configuration file in the application root
pub const KIBANA_FILE: &str = "Kibana";

/// Locates and parses the configuration files of one build
pub struct ConfigLoader {
    build_dir: PathBuf,
    buildpack_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for an application and buildpack directory
    pub fn new(build_dir: impl Into<PathBuf>, buildpack_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            buildpack_dir: buildpack_dir.into(),
        }
    }

    /// Path of the application's Kibana file
    pub fn kibana_file_path(&self) -> PathBuf {
        self.build_dir.join(KIBANA_FILE)
    }

    /// Directory holding the template catalogue and template sources
    pub fn templates_dir(&self) -> PathBuf {
        self.buildpack_dir.join("defaults").join("templates")
    }

    /// Path of the template catalogue
    pub fn templates_file_path(&self) -> PathBuf {
        self.templates_dir().join("templates.yml")
    }

    /// Load the application's Kibana file. The file is required.
    pub async fn load_kibana(&self) -> BuildpackResult<KibanaConfig> {
        let path = self.kibana_file_path();
        if !path.exists() {
            return Err(BuildpackError::ConfigNotFound(path));
        }
        let config: KibanaConfig = load_yaml(&path).await?;
        debug!(
            "Kibana file: version='{}', {} plugin(s), {} config template(s)",
            config.version,
            config.plugins.len(),
            config.config_templates.len()
        );
        Ok(config)
    }

    /// Load the buildpack's template catalogue
    pub async fn load_templates(&self) -> BuildpackResult<TemplatesConfig> {
        let path = self.templates_file_path();
        let config: TemplatesConfig = load_yaml(&path).await?;
        debug!("Template catalogue lists {} template(s)", config.templates.len());
        Ok(config)
    }
}

/// Read and parse a YAML file
pub async fn load_yaml<T>(path: &Path) -> BuildpackResult<T>
where
    T: DeserializeOwned + Default,
{
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;
    parse_yaml(&content, path)
}

/// Parse a YAML document, treating an empty document as the default value
pub fn parse_yaml<T>(content: &str, path: &Path) -> BuildpackResult<T>
where
    T: DeserializeOwned + Default,
{
    let invalid = |e: serde_yaml::Error| BuildpackError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(invalid)?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(invalid)
}
