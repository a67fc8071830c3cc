//! Configuration templates
//!
//! | Step      | Module     | Output                                  |
//! |-----------|------------|-----------------------------------------|
//! | Selection | `selector` | `InstallationPlan` with bound templates |
//! | Rendering | `render`   | `conf.d/<name>.yml` in the dep dir      |

pub mod render;
pub mod selector;

pub use render::{GteRenderer, RenderContext, TemplateRenderer};
pub use selector::{Binding, InstallationPlan, SelectedTemplate, SelectionMode, TemplateSelector};

use crate::config::Alias;
use crate::error::BuildpackResult;
use std::path::Path;
use tracing::info;

/// Render every template of a plan from `templates_dir` into `conf_dir`
pub async fn render_plan(
    plan: &InstallationPlan,
    renderer: &dyn TemplateRenderer,
    alias: &Alias,
    templates_dir: &Path,
    conf_dir: &Path,
) -> BuildpackResult<()> {
    for selected in &plan.templates {
        let name = &selected.template.name;
        info!("       Installing template {}", name);

        let file_name = format!("{name}.yml");
        let context = RenderContext::new(selected.binding.service_instance_name(), alias);
        renderer
            .render(
                name,
                &context,
                &templates_dir.join(&file_name),
                &conf_dir.join(&file_name),
            )
            .await?;
    }
    Ok(())
}
