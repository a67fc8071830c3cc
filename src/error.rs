//! Error types for the buildpack
//!
//! All modules use `BuildpackResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildpack operations
pub type BuildpackResult<T> = Result<T, BuildpackError>;

/// All errors that can occur while staging an application
#[derive(Error, Debug)]
pub enum BuildpackError {
    // Dependency errors
    #[error("No version of {dependency} matches '{requested}': {reason}")]
    VersionNotFound {
        dependency: String,
        requested: String,
        reason: String,
    },

    #[error("Failed to install {dependency}: {reason}")]
    InstallFailed { dependency: String, reason: String },

    #[error("Checksum mismatch for {dependency}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        dependency: String,
        expected: String,
        actual: String,
    },

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    // Template binding errors
    #[error("No service found for template {template}")]
    NoServiceFound { template: String },

    #[error("More than one service found for template {template}: {}", candidates.join(", "))]
    AmbiguousServiceBinding {
        template: String,
        candidates: Vec<String>,
    },

    #[error("Template {template} requires a service instance name, none defined in Kibana file")]
    MissingServiceInstanceName { template: String },

    #[error("Failed to render template {template}: {reason}")]
    TemplateRender { template: String, reason: String },

    // Certificate and plugin errors
    #[error("Certificate {name} not found: no {name}.crt in the certificates directory")]
    CertificateNotFound { name: String },

    #[error("Failed to install Kibana plugin {plugin}: {reason}")]
    PluginInstall { plugin: String, reason: String },

    // Cache errors (collected and logged, never fatal)
    #[error("Failed to remove cached dependency {path}: {source}")]
    CacheIoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, output: {output}")]
    CommandExecution { command: String, output: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildpackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Attach a dependency name to an error raised while installing it
    pub fn install_failed(dependency: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::InstallFailed {
            dependency: dependency.into(),
            reason: cause.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::VersionNotFound { .. } => {
                Some("Check the 'version' entry of the Kibana file against the versions in manifest.yml")
            }
            Self::NoServiceFound { .. } => Some(
                "Bind a service carrying one of the template's tags, or set 'enable-service-fallback: true' in the Kibana file",
            ),
            Self::AmbiguousServiceBinding { .. } => Some(
                "List the template under 'config-templates' in the Kibana file with an explicit 'service-instance-name'",
            ),
            Self::MissingServiceInstanceName { .. } => {
                Some("Add 'service-instance-name' to the template entry in the Kibana file")
            }
            Self::CertificateNotFound { .. } => {
                Some("Place the <name>.crt file in the application's certificates directory")
            }
            Self::ConfigNotFound(_) => Some("Add a Kibana file to the root of the application"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_template() {
        let err = BuildpackError::NoServiceFound {
            template: "kibana-es".to_string(),
        };
        assert!(err.to_string().contains("kibana-es"));
    }

    #[test]
    fn ambiguous_binding_lists_candidates() {
        let err = BuildpackError::AmbiguousServiceBinding {
            template: "kibana-es".to_string(),
            candidates: vec!["es-a".to_string(), "es-b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "More than one service found for template kibana-es: es-a, es-b"
        );
    }

    #[test]
    fn error_hint() {
        let err = BuildpackError::MissingServiceInstanceName {
            template: "kibana-es".to_string(),
        };
        assert!(err.hint().unwrap().contains("service-instance-name"));
        assert!(BuildpackError::Internal("x".to_string()).hint().is_none());
    }
}
