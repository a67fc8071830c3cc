//! The supply step: stage Kibana, its tools, configuration and plugins

use crate::cache::DependencyCache;
use crate::certificates;
use crate::config::{ConfigLoader, KibanaConfig};
use crate::dependency::{
    ArtifactInstaller, Dependency, DependencyInstaller, VersionManifest,
};
use crate::environment::Environment;
use crate::error::{BuildpackError, BuildpackResult};
use crate::logging::LogHandle;
use crate::plugin::{
    install_plugins, list_plugins, required_bundles, KibanaPluginTool, PluginSource, PluginTool,
    SourceKind, KIBANA_PLUGINS, X_PACK,
};
use crate::stage::profile;
use crate::stage::stager::Stager;
use crate::template::{
    render_plan, GteRenderer, SelectionMode, TemplateRenderer, TemplateSelector,
};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

const GTE: &str = "gte";
const JQ: &str = "jq";
const KIBANA: &str = "kibana";

/// Segments every dependency version is expanded to
const VERSION_PARTS: usize = 3;

/// Dep dir subdirectories prepared for the runtime
const DEP_SUBDIRS: [&str; 3] = ["conf.d", "plugins", "certificates"];

/// Creates the tools a build drives once their dependency is staged
pub trait ToolFactory: Send + Sync {
    fn template_renderer(&self, gte: &Dependency) -> Box<dyn TemplateRenderer>;
    fn plugin_tool(&self, kibana: &Dependency) -> Box<dyn PluginTool>;
}

/// Tools run from the staged dependencies
pub struct StagedTools;

impl ToolFactory for StagedTools {
    fn template_renderer(&self, gte: &Dependency) -> Box<dyn TemplateRenderer> {
        Box::new(GteRenderer::new(&gte.staging_location))
    }

    fn plugin_tool(&self, kibana: &Dependency) -> Box<dyn PluginTool> {
        Box::new(KibanaPluginTool::new(&kibana.staging_location))
    }
}

/// What a supply run staged
#[derive(Debug, Clone)]
pub struct SupplyReport {
    pub kibana_version: String,
    pub mode: SelectionMode,
    pub templates: Vec<String>,
    pub plugins: Vec<String>,
    pub warnings: Vec<String>,
    /// Cache entries removed at the end of the build
    pub swept: Vec<String>,
}

/// Runs the supply step for one build
pub struct Supplier {
    stager: Stager,
    environment: Environment,
    manifest: Arc<dyn VersionManifest>,
    artifacts: Box<dyn ArtifactInstaller>,
    tools: Box<dyn ToolFactory>,
    log: Option<LogHandle>,
}

impl Supplier {
    pub fn new(
        stager: Stager,
        environment: Environment,
        manifest: Arc<dyn VersionManifest>,
        artifacts: Box<dyn ArtifactInstaller>,
        tools: Box<dyn ToolFactory>,
    ) -> Self {
        Self {
            stager,
            environment,
            manifest,
            artifacts,
            tools,
            log: None,
        }
    }

    /// Let `buildpack.log-level: debug` raise the log level
    pub fn with_log_handle(mut self, log: LogHandle) -> Self {
        self.log = Some(log);
        self
    }

    pub async fn run(self) -> BuildpackResult<SupplyReport> {
        let Self {
            stager,
            environment,
            manifest,
            artifacts,
            tools,
            log,
        } = self;

        let loader = ConfigLoader::new(stager.build_dir(), stager.buildpack_dir());
        let config = loader.load_kibana().await?;
        if config.buildpack.is_debug() {
            if let Some(log) = &log {
                log.enable_debug();
            }
        }
        log_directories(&stager);

        let cache = DependencyCache::new(stager.cache_dir(), config.buildpack.no_cache);
        let mut installer =
            DependencyInstaller::new(manifest, artifacts, cache, stager.dependency_roots());
        installer.reconcile_cache().await?;

        for dir in DEP_SUBDIRS {
            stager.ensure_dep_subdir(dir).await?;
        }

        let catalogue = loader.load_templates().await?;
        let config_files_exist = has_entries(&stager.build_dir().join("conf.d")).await?;

        let gte = installer.install(GTE, VERSION_PARTS, "").await?;
        write_profile(&stager, GTE, &profile::tool_script("GTE_HOME", &gte)).await?;
        let jq = installer.install(JQ, VERSION_PARTS, "").await?;
        write_profile(&stager, JQ, &profile::tool_script("JQ_HOME", &jq)).await?;

        let mode = SelectionMode::decide(config_files_exist, &config.config_templates);
        let mut plan = TemplateSelector::new(
            &catalogue,
            &environment.services,
            config.enable_service_fallback,
        )
        .select(mode, &config.config_templates)?;
        plan.demand_plugins(&config.plugins);

        let renderer = tools.template_renderer(&gte);
        render_plan(
            &plan,
            renderer.as_ref(),
            &catalogue.alias,
            &loader.templates_dir(),
            &stager.dep_dir().join("conf.d"),
        )
        .await?;

        stage_certificates(&stager, &config).await?;

        let kibana = installer
            .install(KIBANA, VERSION_PARTS, &config.version)
            .await?;
        write_profile(
            &stager,
            KIBANA,
            &profile::kibana_script(&config, stager.deps_idx(), &kibana),
        )
        .await?;

        let tool = tools.plugin_tool(&kibana);
        if !plan.plugins.is_empty() {
            let (x_pack, others) = required_bundles(&plan.plugins);
            let mut sources = Vec::new();
            // Bundles follow the configured Kibana version
            if x_pack {
                let bundle = installer
                    .install(X_PACK, VERSION_PARTS, &config.version)
                    .await?;
                sources.push(PluginSource::new(SourceKind::XPack, bundle.staging_location));
            }
            if others {
                let bundle = installer
                    .install(KIBANA_PLUGINS, VERSION_PARTS, &config.version)
                    .await?;
                sources.push(PluginSource::new(
                    SourceKind::KibanaPlugins,
                    bundle.staging_location,
                ));
            }
            sources.push(PluginSource::new(
                SourceKind::User,
                stager.build_dir().join("plugins"),
            ));

            install_plugins(tool.as_ref(), &plan.plugins, &sources).await?;
        }
        list_plugins(tool.as_ref()).await?;

        let swept = installer.sweep_cache().await;

        let mut staged = BTreeMap::new();
        staged.insert("KibanaVersion", kibana.version.clone());
        stager.write_config_yml(&staged).await?;

        Ok(SupplyReport {
            kibana_version: kibana.version,
            mode,
            templates: plan
                .templates
                .iter()
                .map(|t| t.template.name.clone())
                .collect(),
            plugins: plan.plugins.into_iter().collect(),
            warnings: plan.warnings,
            swept: swept.removed,
        })
    }
}

fn log_directories(stager: &Stager) {
    debug!("Staging directories:");
    debug!("  Cache dir: {}", stager.cache_dir().display());
    debug!("  Build dir: {}", stager.build_dir().display());
    debug!("  Buildpack dir: {}", stager.buildpack_dir().display());
    debug!("  Dependency dir: {}", stager.dep_dir().display());
    debug!("  DepsIdx: {}", stager.deps_idx());
}

async fn write_profile(stager: &Stager, dependency: &str, content: &str) -> BuildpackResult<()> {
    stager
        .write_profile_d(&profile::script_name(dependency), content)
        .await
}

async fn stage_certificates(stager: &Stager, config: &KibanaConfig) -> BuildpackResult<()> {
    let paths = certificates::resolve_certificates(stager.build_dir(), &config.certificates).await?;
    if paths.is_empty() {
        return Ok(());
    }
    info!("-----> Installed {} user certificate(s)", paths.len());
    write_profile(stager, "certificates", &certificates::profile_script(&paths)?).await
}

/// Whether `dir` exists and holds at least one entry
async fn has_entries(dir: &Path) -> BuildpackResult<bool> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(BuildpackError::io(format!("reading {}", dir.display()), e)),
    };
    let first = entries
        .next_entry()
        .await
        .map_err(|e| BuildpackError::io(format!("reading {}", dir.display()), e))?;
    Ok(first.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KIBANA_FILE;
    use crate::dependency::installer::tests::RecordingInstaller;
    use crate::dependency::version::tests::FakeManifest;
    use crate::plugin::install::tests::FakePluginTool;
    use crate::template::render::tests::CopyRenderer;
    use tempfile::TempDir;

    const TEMPLATES_YML: &str = r#"
templates:
  - name: base
    is-default: true
    plugins: [x-pack]
  - name: es
    is-default: true
    tags: [elasticsearch]
"#;

    #[derive(Default, Clone)]
    struct FakeTools {
        renderer: CopyRenderer,
        plugins: FakePluginTool,
    }

    impl ToolFactory for FakeTools {
        fn template_renderer(&self, _gte: &Dependency) -> Box<dyn TemplateRenderer> {
            Box::new(self.renderer.clone())
        }

        fn plugin_tool(&self, _kibana: &Dependency) -> Box<dyn PluginTool> {
            Box::new(self.plugins.clone())
        }
    }

    struct Fixture {
        temp: TempDir,
        stager: Stager,
    }

    impl Fixture {
        fn new(kibana_file: Option<&str>) -> Self {
            let temp = TempDir::new().unwrap();
            let build = temp.path().join("build");
            let templates = temp.path().join("bp/defaults/templates");
            std::fs::create_dir_all(&build).unwrap();
            std::fs::create_dir_all(&templates).unwrap();
            std::fs::write(templates.join("templates.yml"), TEMPLATES_YML).unwrap();
            std::fs::write(templates.join("base.yml"), "server.port: <<.PORT>>").unwrap();
            std::fs::write(templates.join("es.yml"), "elasticsearch.url: x").unwrap();
            if let Some(content) = kibana_file {
                std::fs::write(build.join(KIBANA_FILE), content).unwrap();
            }

            let stager = Stager::new(
                build,
                temp.path().join("cache"),
                temp.path().join("deps"),
                "0",
                temp.path().join("bp"),
            );
            Self { temp, stager }
        }

        fn path(&self, rel: &str) -> std::path::PathBuf {
            self.temp.path().join(rel)
        }

        fn supplier(&self, environment: Environment, tools: FakeTools, artifacts: RecordingInstaller) -> Supplier {
            let manifest = FakeManifest::default()
                .with("gte", &["3.1.0"], Some("3.1.0"))
                .with("jq", &["1.5.0"], Some("1.5.0"))
                .with("kibana", &["6.2.1", "6.2.2"], Some("6.2"))
                .with("x-pack", &["6.2.2"], Some("6.2"))
                .with("kibana-plugins", &["6.2.2"], Some("6.2"));
            Supplier::new(
                self.stager.clone(),
                environment,
                Arc::new(manifest),
                Box::new(artifacts),
                Box::new(tools),
            )
        }
    }

    fn es_environment(instances: &[&str]) -> Environment {
        let list: Vec<String> = instances
            .iter()
            .map(|name| format!(r#"{{"name":"{name}","label":"elasticsearch","tags":["elasticsearch"]}}"#))
            .collect();
        let services = format!(r#"{{"elasticsearch":[{}]}}"#, list.join(","));
        Environment::parse("", &services).unwrap()
    }

    #[tokio::test]
    async fn stages_everything_for_auto_mode() {
        let fixture = Fixture::new(Some("version: \"6\"\nplugins:\n  - logtrail\n"));
        let user_plugins = fixture.path("build/plugins");
        std::fs::create_dir_all(&user_plugins).unwrap();
        std::fs::write(user_plugins.join("logtrail-0.1.zip"), b"zip").unwrap();
        for stale in ["kibana-6.2.1", "curator-5.4.0"] {
            std::fs::create_dir_all(fixture.path("cache/dependencies").join(stale)).unwrap();
        }

        let tools = FakeTools::default();
        let artifacts = RecordingInstaller::default();
        let report = fixture
            .supplier(es_environment(&["my-es"]), tools.clone(), artifacts.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.kibana_version, "6.2.2");
        assert_eq!(report.mode, SelectionMode::Auto);
        assert_eq!(report.templates, vec!["base", "es"]);
        assert_eq!(report.plugins, vec!["logtrail", "x-pack"]);
        assert_eq!(report.swept, vec!["curator-5.4.0"]);
        assert_eq!(
            *artifacts.calls.lock().unwrap(),
            vec![
                "gte-3.1.0",
                "jq-1.5.0",
                "kibana-6.2.2",
                "x-pack-6.2.2",
                "kibana-plugins-6.2.2"
            ]
        );

        assert_eq!(
            tools.renderer.calls.lock().unwrap()[1],
            ("es".to_string(), "my-es".to_string())
        );
        assert!(fixture.path("deps/0/conf.d/base.yml").is_file());
        assert_eq!(
            *tools.plugins.installed.lock().unwrap(),
            vec![
                format!("file://{}", user_plugins.join("logtrail-0.1.zip").display()),
                "x-pack".to_string()
            ]
        );

        for script in ["gte.sh", "jq.sh", "kibana.sh"] {
            assert!(fixture.path("deps/0/profile.d").join(script).is_file(), "{script}");
        }
        assert!(!fixture.path("deps/0/profile.d/certificates.sh").exists());
        assert!(!fixture.path("cache/dependencies/kibana-6.2.1").exists());
        assert!(fixture.path("cache/dependencies/kibana-6.2.2").exists());

        let config = std::fs::read_to_string(fixture.path("deps/0/config.yml")).unwrap();
        assert!(config.contains("KibanaVersion: 6.2.2"));
    }

    #[tokio::test]
    async fn explicit_mode_skips_unneeded_bundles() {
        let fixture = Fixture::new(Some(
            "config-templates:\n  - name: es\n    service-instance-name: prod-es\n",
        ));

        let tools = FakeTools::default();
        let artifacts = RecordingInstaller::default();
        let report = fixture
            .supplier(Environment::default(), tools.clone(), artifacts.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.mode, SelectionMode::Explicit);
        assert_eq!(report.templates, vec!["es"]);
        assert!(report.plugins.is_empty());
        assert_eq!(artifacts.calls.lock().unwrap().len(), 3);
        assert!(tools.plugins.installed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn certificates_are_exported() {
        let fixture = Fixture::new(Some(
            "certificates: [ca]\nconfig-templates:\n  - name: base\n",
        ));
        let certs = fixture.path("build/certificates");
        std::fs::create_dir_all(&certs).unwrap();
        std::fs::write(certs.join("ca.crt"), b"cert").unwrap();

        fixture
            .supplier(Environment::default(), FakeTools::default(), RecordingInstaller::default())
            .run()
            .await
            .unwrap();

        let script =
            std::fs::read_to_string(fixture.path("deps/0/profile.d/certificates.sh")).unwrap();
        assert!(script.contains("$HOME/certificates/ca.crt"));
    }

    #[tokio::test]
    async fn missing_kibana_file_aborts() {
        let fixture = Fixture::new(None);
        let err = fixture
            .supplier(Environment::default(), FakeTools::default(), RecordingInstaller::default())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildpackError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn ambiguous_service_aborts_before_kibana_install() {
        let fixture = Fixture::new(Some("version: \"6.2\"\n"));
        let artifacts = RecordingInstaller::default();

        let err = fixture
            .supplier(es_environment(&["es-a", "es-b"]), FakeTools::default(), artifacts.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BuildpackError::AmbiguousServiceBinding { .. }));
        assert!(!artifacts
            .calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.starts_with("kibana")));
    }

    #[tokio::test]
    async fn app_conf_d_forces_explicit_mode() {
        let fixture = Fixture::new(Some("version: \"6.2\"\n"));
        let conf_d = fixture.path("build/conf.d");
        std::fs::create_dir_all(&conf_d).unwrap();
        std::fs::write(conf_d.join("custom.yml"), "a: b").unwrap();

        let report = fixture
            .supplier(Environment::default(), FakeTools::default(), RecordingInstaller::default())
            .run()
            .await
            .unwrap();
        assert_eq!(report.mode, SelectionMode::Explicit);
        assert!(report.templates.is_empty());
    }
}
