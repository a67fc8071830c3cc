//! Template selection and service binding
//!
//! Auto mode installs every default template and binds tagged templates to
//! the single matching service. Explicit mode installs only the templates
//! named in the Kibana file, bound to the instance named there.

use crate::config::{ConfigTemplate, Template, TemplatesConfig};
use crate::environment::{matching_instances, ServiceInstance};
use crate::error::{BuildpackError, BuildpackResult};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// How templates are chosen for the whole build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Install default templates, binding through service tags
    Auto,
    /// Install only templates named in the Kibana file
    Explicit,
}

impl SelectionMode {
    /// Explicit as soon as the app ships its own `conf.d` files or the
    /// Kibana file names templates
    pub fn decide(config_files_exist: bool, explicit: &[ConfigTemplate]) -> Self {
        if config_files_exist || !explicit.is_empty() {
            Self::Explicit
        } else {
            Self::Auto
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Explicit => write!(f, "explicit"),
        }
    }
}

/// Service a selected template is rendered against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Unbound,
    Service(String),
}

impl Binding {
    /// Instance name handed to the template engine; empty when unbound
    pub fn service_instance_name(&self) -> &str {
        match self {
            Self::Unbound => "",
            Self::Service(name) => name,
        }
    }
}

/// A template chosen for installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTemplate {
    pub template: Template,
    pub binding: Binding,
}

/// Templates to install plus the plugins they demand
#[derive(Debug, Clone)]
pub struct InstallationPlan {
    pub mode: SelectionMode,
    pub templates: Vec<SelectedTemplate>,
    pub plugins: BTreeSet<String>,
    pub warnings: Vec<String>,
}

impl InstallationPlan {
    fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            templates: vec![],
            plugins: BTreeSet::new(),
            warnings: vec![],
        }
    }

    fn push(&mut self, template: &Template, binding: Binding) {
        self.plugins.extend(template.plugins.iter().cloned());
        self.templates.push(SelectedTemplate {
            template: template.clone(),
            binding,
        });
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Add plugins requested outside of templates
    pub fn demand_plugins<I, S>(&mut self, plugins: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.plugins.extend(
            plugins
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty()),
        );
    }
}

/// Decides which templates a build installs
pub struct TemplateSelector<'a> {
    catalogue: &'a TemplatesConfig,
    services: &'a [ServiceInstance],
    fallback_enabled: bool,
}

impl<'a> TemplateSelector<'a> {
    /// `fallback_enabled` lets every tagged template install unbound when no
    /// service matches, in addition to templates marked `is-fallback`
    pub fn new(
        catalogue: &'a TemplatesConfig,
        services: &'a [ServiceInstance],
        fallback_enabled: bool,
    ) -> Self {
        Self {
            catalogue,
            services,
            fallback_enabled,
        }
    }

    /// Select templates for the build
    pub fn select(
        &self,
        mode: SelectionMode,
        explicit: &[ConfigTemplate],
    ) -> BuildpackResult<InstallationPlan> {
        debug!("Selecting templates in {} mode", mode);
        let mut plan = InstallationPlan::new(mode);
        match mode {
            SelectionMode::Auto => self.select_auto(&mut plan)?,
            SelectionMode::Explicit => self.select_explicit(explicit, &mut plan)?,
        }
        Ok(plan)
    }

    fn select_auto(&self, plan: &mut InstallationPlan) -> BuildpackResult<()> {
        for template in self.catalogue.templates.iter().filter(|t| t.is_default) {
            let binding = self.bind_by_tags(template, plan)?;
            plan.push(template, binding);
        }
        Ok(())
    }

    fn bind_by_tags(
        &self,
        template: &Template,
        plan: &mut InstallationPlan,
    ) -> BuildpackResult<Binding> {
        if !template.requires_service() {
            return Ok(Binding::Unbound);
        }

        let matched = matching_instances(&template.tags, self.services);
        let mut candidates: Vec<&str> = Vec::new();
        for instance in matched.tagged.iter().chain(matched.user_provided.iter()) {
            if !candidates.contains(&instance.name.as_str()) {
                candidates.push(&instance.name);
            }
        }

        match candidates.as_slice() {
            [] if template.is_fallback || self.fallback_enabled => {
                plan.warn(format!(
                    "No service found for template {}, will do the fallback. Please bind a service and restage the app",
                    template.name
                ));
                Ok(Binding::Unbound)
            }
            [] => Err(BuildpackError::NoServiceFound {
                template: template.name.clone(),
            }),
            [single] => {
                debug!("Template {} bound to service {}", template.name, single);
                Ok(Binding::Service(single.to_string()))
            }
            many => Err(BuildpackError::AmbiguousServiceBinding {
                template: template.name.clone(),
                candidates: many.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    fn select_explicit(
        &self,
        explicit: &[ConfigTemplate],
        plan: &mut InstallationPlan,
    ) -> BuildpackResult<()> {
        for configured in explicit {
            let name = configured.name.trim();
            if name.is_empty() {
                plan.warn(
                    "Skipping template: no valid name defined for template in Kibana file"
                        .to_string(),
                );
                continue;
            }

            let Some(template) = self.catalogue.find(name) else {
                plan.warn(format!(
                    "Template {} defined in Kibana file does not exist",
                    name
                ));
                continue;
            };

            let instance = configured.service_instance_name.trim();
            let binding = match (instance.is_empty(), template.requires_service()) {
                (true, true) => {
                    return Err(BuildpackError::MissingServiceInstanceName {
                        template: name.to_string(),
                    })
                }
                (false, false) => {
                    plan.warn(format!(
                        "Service instance name '{}' is defined for template {} in Kibana file but template can not be bound to a service",
                        instance, name
                    ));
                    Binding::Unbound
                }
                (true, false) => Binding::Unbound,
                // Trusted as configured; not checked against bound services
                (false, true) => Binding::Service(instance.to_string()),
            };
            plan.push(template, binding);
        }
        Ok(())
    }
}
