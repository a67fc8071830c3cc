//! Kibana plugins: choosing an artifact per plugin and installing it

pub mod install;
pub mod source;

pub use install::{install_plugins, list_plugins, KibanaPluginTool, PluginTool};
pub use source::{resolve_source, PluginArtifact, PluginSource, SourceKind};

/// Bundle dependency providing plugins whose name starts with "x-pack"
pub const X_PACK: &str = "x-pack";

/// Bundle dependency providing every other plugin
pub const KIBANA_PLUGINS: &str = "kibana-plugins";

/// Which offline bundles a set of plugins needs: (x-pack, kibana-plugins)
pub fn required_bundles<'a, I>(plugins: I) -> (bool, bool)
where
    I: IntoIterator<Item = &'a String>,
{
    plugins
        .into_iter()
        .fold((false, false), |(x_pack, others), plugin| {
            if plugin.starts_with(X_PACK) {
                (true, others)
            } else {
                (x_pack, true)
            }
        })
}
