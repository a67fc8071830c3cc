//! Installing plugins with the `kibana-plugin` tool

use crate::error::{BuildpackError, BuildpackResult};
use crate::plugin::source::{resolve_source, PluginSource};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Kibana's plugin management CLI
#[async_trait]
pub trait PluginTool: Send + Sync {
    /// Install from a path, `file://` URL, URL or plugin name
    async fn install(&self, reference: &str) -> BuildpackResult<String>;

    /// Output of the installed plugin listing
    async fn list(&self) -> BuildpackResult<String>;
}

/// `bin/kibana-plugin` of a staged Kibana
pub struct KibanaPluginTool {
    binary: PathBuf,
}

impl KibanaPluginTool {
    pub fn new(kibana_home: &Path) -> Self {
        Self {
            binary: kibana_home.join("bin").join("kibana-plugin"),
        }
    }

    async fn exec(&self, args: &[&str]) -> BuildpackResult<std::process::Output> {
        debug!("Executing: kibana-plugin {:?}", args);

        Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BuildpackError::command_failed(format!("kibana-plugin {:?}", args), e))
    }
}

fn combined(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

#[async_trait]
impl PluginTool for KibanaPluginTool {
    async fn install(&self, reference: &str) -> BuildpackResult<String> {
        let output = self.exec(&["install", reference]).await?;
        let text = combined(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(BuildpackError::command_exec(
                format!("kibana-plugin install {reference}"),
                text,
            ))
        }
    }

    async fn list(&self) -> BuildpackResult<String> {
        let output = self.exec(&["list"]).await?;
        let text = combined(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(BuildpackError::command_exec("kibana-plugin list", text))
        }
    }
}

/// Install each plugin from its highest priority source
pub async fn install_plugins(
    tool: &dyn PluginTool,
    plugins: &BTreeSet<String>,
    sources: &[PluginSource],
) -> BuildpackResult<()> {
    if plugins.is_empty() {
        return Ok(());
    }

    info!("-----> Installing Kibana plugins (this can take a few minutes!) ...");
    for plugin in plugins {
        let reference = resolve_source(plugin, sources).await.install_reference();
        info!("       - installing plugin {}", plugin);

        if let Err(e) = tool.install(&reference).await {
            let reason = match e {
                BuildpackError::CommandExecution { output, .. } => output,
                other => other.to_string(),
            };
            error!("Error installing Kibana plugin {}", plugin);
            return Err(BuildpackError::PluginInstall {
                plugin: plugin.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// Log the plugins Kibana reports as installed
pub async fn list_plugins(tool: &dyn PluginTool) -> BuildpackResult<()> {
    info!("-----> Listing all installed Kibana plugins ...");
    let listing = tool.list().await?;
    for line in listing.lines() {
        info!("       {}", line);
    }
    Ok(())
}
