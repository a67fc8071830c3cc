//! Configuration schema
//!
//! Two YAML documents configure a build:
//! - `<build>/Kibana`: the application's own settings
//! - `<buildpack>/defaults/templates/templates.yml`: the template catalogue

use serde::{Deserialize, Serialize};

/// Root of the application's `Kibana` file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KibanaConfig {
    /// Requested Kibana version (partial versions are expanded)
    pub version: String,

    /// Plugins to install in addition to those required by templates
    pub plugins: Vec<String>,

    /// Certificate names to stage from `<build>/certificates/<name>.crt`
    pub certificates: Vec<String>,

    /// Extra command line arguments for the Kibana process
    pub cmd_args: String,

    /// NODE_OPTIONS override; disables the heap size calculation
    #[serde(rename = "nodejs-options")]
    pub node_opts: String,

    /// Memory in MB reserved outside the Node heap
    pub reserved_memory: u32,

    /// Share of the remaining memory given to the Node heap
    pub heap_percentage: u32,

    /// Run a configuration check before starting
    pub config_check: bool,

    /// Explicit template selection; switches template selection to explicit mode
    pub config_templates: Vec<ConfigTemplate>,

    /// Install tagged templates unbound when no service matches
    pub enable_service_fallback: bool,

    /// Settings for the buildpack itself
    pub buildpack: BuildpackSettings,
}

impl Default for KibanaConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            plugins: vec![],
            certificates: vec![],
            cmd_args: String::new(),
            node_opts: String::new(),
            reserved_memory: 300,
            heap_percentage: 90,
            config_check: false,
            config_templates: vec![],
            enable_service_fallback: false,
            buildpack: BuildpackSettings::default(),
        }
    }
}

/// `buildpack:` section of the Kibana file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildpackSettings {
    /// "Info" or "Debug" (case-insensitive)
    pub log_level: String,

    /// Empty the build cache before staging and never keep installed slots
    pub no_cache: bool,

    /// Sleep instead of starting Kibana (debugging aid)
    #[serde(rename = "sleep-command")]
    pub do_sleep_command: bool,
}

impl Default for BuildpackSettings {
    fn default() -> Self {
        Self {
            log_level: "Info".to_string(),
            no_cache: false,
            do_sleep_command: false,
        }
    }
}

impl BuildpackSettings {
    /// Whether debug logging was requested
    pub fn is_debug(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("debug")
    }
}

/// One entry of `config-templates`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfigTemplate {
    pub name: String,
    pub service_instance_name: String,
}

/// Root of `templates.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Credential field names handed to the template engine
    pub alias: Alias,

    /// Known templates, in catalogue order
    pub templates: Vec<Template>,
}

impl TemplatesConfig {
    /// Look up a template by exact name
    pub fn find(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// Credential field aliases used while rendering templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Alias {
    pub credentials_host_field: String,
    pub credentials_username_field: String,
    pub credentials_password_field: String,
}

impl Default for Alias {
    fn default() -> Self {
        Self {
            credentials_host_field: "host".to_string(),
            credentials_username_field: "username".to_string(),
            credentials_password_field: "password".to_string(),
        }
    }
}

/// A configuration template known to the buildpack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Template {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Installed in auto mode
    pub is_default: bool,

    /// May install unbound when no service matches
    pub is_fallback: bool,

    /// Service tags, any one of which binds the template
    pub tags: Vec<String>,

    /// Plugins the rendered configuration relies on
    pub plugins: Vec<String>,
}

impl Template {
    /// Whether this template needs a service binding
    pub fn requires_service(&self) -> bool {
        !self.tags.is_empty()
    }
}
