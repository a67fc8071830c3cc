//! Rendering of selected templates with the `gte` engine

use crate::config::Alias;
use crate::error::{BuildpackError, BuildpackResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Port Kibana listens on inside the container
pub const DEFAULT_PORT: u16 = 8080;

/// Delimiters understood by the rendered templates
const DELIMITERS: &str = "<<:>>";

/// Values a template is rendered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub service_instance_name: String,
    pub alias: Alias,
    pub port: u16,
}

impl RenderContext {
    pub fn new(service_instance_name: impl Into<String>, alias: &Alias) -> Self {
        Self {
            service_instance_name: service_instance_name.into(),
            alias: alias.clone(),
            port: DEFAULT_PORT,
        }
    }

    /// Environment handed to the template engine
    pub fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SERVICE_INSTANCE_NAME", self.service_instance_name.clone()),
            (
                "CREDENTIALS_HOST_FIELD",
                self.alias.credentials_host_field.clone(),
            ),
            (
                "CREDENTIALS_USERNAME_FIELD",
                self.alias.credentials_username_field.clone(),
            ),
            (
                "CREDENTIALS_PASSWORD_FIELD",
                self.alias.credentials_password_field.clone(),
            ),
            ("PORT", self.port.to_string()),
        ]
    }
}

/// Renders one template file into a configuration file
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        source: &Path,
        destination: &Path,
    ) -> BuildpackResult<()>;
}

/// Runs the `gte` binary of an installed gte dependency
pub struct GteRenderer {
    binary: PathBuf,
}

impl GteRenderer {
    /// `gte_home` is the staging location of the gte dependency
    pub fn new(gte_home: &Path) -> Self {
        Self {
            binary: gte_home.join("gte"),
        }
    }
}

#[async_trait]
impl TemplateRenderer for GteRenderer {
    async fn render(
        &self,
        template: &str,
        context: &RenderContext,
        source: &Path,
        destination: &Path,
    ) -> BuildpackResult<()> {
        debug!(
            "Rendering {} to {} (service '{}')",
            source.display(),
            destination.display(),
            context.service_instance_name
        );

        let output = Command::new(&self.binary)
            .arg("-d")
            .arg(DELIMITERS)
            .arg(source)
            .arg(destination)
            .envs(context.env())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BuildpackError::TemplateRender {
                template: template.to_string(),
                reason: format!("could not run {}: {}", self.binary.display(), e),
            })?;

        if !output.status.success() {
            let mut reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if reason.is_empty() {
                reason = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(BuildpackError::TemplateRender {
                template: template.to_string(),
                reason,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Copies the source to the destination and records each call
    #[derive(Default, Clone)]
    pub(crate) struct CopyRenderer {
        pub calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl TemplateRenderer for CopyRenderer {
        async fn render(
            &self,
            template: &str,
            context: &RenderContext,
            source: &Path,
            destination: &Path,
        ) -> BuildpackResult<()> {
            self.calls.lock().unwrap().push((
                template.to_string(),
                context.service_instance_name.clone(),
            ));
            tokio::fs::copy(source, destination)
                .await
                .map_err(|e| BuildpackError::TemplateRender {
                    template: template.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(())
        }
    }

    #[test]
    fn context_env_uses_alias_fields() {
        let alias = Alias {
            credentials_host_field: "uri".to_string(),
            ..Default::default()
        };
        let env = RenderContext::new("mydb", &alias).env();
        assert!(env.contains(&("SERVICE_INSTANCE_NAME", "mydb".to_string())));
        assert!(env.contains(&("CREDENTIALS_HOST_FIELD", "uri".to_string())));
        assert!(env.contains(&("CREDENTIALS_PASSWORD_FIELD", "password".to_string())));
        assert!(env.contains(&("PORT", "8080".to_string())));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn gte_receives_context_and_paths() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let gte = temp.path().join("gte");
        std::fs::write(
            &gte,
            "#!/bin/sh\necho \"$2 $SERVICE_INSTANCE_NAME $PORT\" > \"$4\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&gte, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = temp.path().join("base.yml");
        std::fs::write(&source, "x").unwrap();
        let dest = temp.path().join("out.yml");

        GteRenderer::new(temp.path())
            .render("base", &RenderContext::new("es", &Alias::default()), &source, &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap().trim(), "<<:>> es 8080");
    }

    #[tokio::test]
    async fn missing_binary_names_template() {
        let temp = TempDir::new().unwrap();
        let err = GteRenderer::new(temp.path())
            .render(
                "base",
                &RenderContext::new("", &Alias::default()),
                Path::new("a.yml"),
                Path::new("b.yml"),
            )
            .await
            .unwrap_err();
        match err {
            BuildpackError::TemplateRender { template, .. } => assert_eq!(template, "base"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
