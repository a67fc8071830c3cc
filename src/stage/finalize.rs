//! The finalize step: start script and release information

use crate::config::load_yaml;
use crate::error::{BuildpackError, BuildpackResult};
use crate::stage::profile::trim_lines;
use crate::stage::stager::Stager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Start command registered for the `web` process
pub const START_SCRIPT: &str = "bin/run.sh";

/// File the platform reads the release information from
pub const RELEASE_FILE: &str = "buildpack-release-step.yml";

/// Values the supply step recorded in `config.yml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StagedConfig {
    config: StagedValues,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StagedValues {
    kibana_version: String,
}

#[derive(Serialize)]
struct Release<'a> {
    default_process_types: BTreeMap<&'a str, &'a str>,
}

/// Runs the finalize step for one build
pub struct Finalizer {
    stager: Stager,
    release_dir: PathBuf,
    kibana_version: String,
}

impl Finalizer {
    /// Read the supply step's `config.yml`; `release_dir` receives the
    /// release YAML
    pub async fn new(stager: Stager, release_dir: impl Into<PathBuf>) -> BuildpackResult<Self> {
        let path = stager.dep_dir().join("config.yml");
        if !path.exists() {
            return Err(BuildpackError::ConfigNotFound(path));
        }
        let staged: StagedConfig = load_yaml(&path).await?;
        if staged.config.kibana_version.is_empty() {
            return Err(BuildpackError::ConfigInvalid {
                path,
                reason: "config.KibanaVersion is missing".to_string(),
            });
        }

        Ok(Self {
            stager,
            release_dir: release_dir.into(),
            kibana_version: staged.config.kibana_version,
        })
    }

    /// Kibana version staged by the supply step
    pub fn kibana_version(&self) -> &str {
        &self.kibana_version
    }

    pub async fn run(&self) -> BuildpackResult<()> {
        info!("-----> Finalizing Kibana {}", self.kibana_version);

        let bin = self.stager.build_dir().join("bin");
        fs::create_dir_all(&bin)
            .await
            .map_err(|e| BuildpackError::io(format!("creating {}", bin.display()), e))?;

        let script = self.stager.build_dir().join(START_SCRIPT);
        write_executable(&script, &start_script()).await?;

        let release = serde_yaml::to_string(&Release {
            default_process_types: [("web", START_SCRIPT)].into_iter().collect(),
        })?;
        let release_path = self.release_dir.join(RELEASE_FILE);
        fs::write(&release_path, release)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", release_path.display()), e))?;

        self.stager
            .write_profile_d("bin-path.sh", "export PATH=$HOME/bin:$PATH\n")
            .await
    }
}

async fn write_executable(path: &Path, content: &str) -> BuildpackResult<()> {
    fs::write(path, content)
        .await
        .map_err(|e| BuildpackError::io(format!("writing {}", path.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| BuildpackError::io(format!("setting mode on {}", path.display()), e))?;
    }
    Ok(())
}

/// Shell script that sizes the Node heap, renders configuration and starts Kibana
fn start_script() -> String {
    trim_lines(
        r#"
        echo "--> STARTING UP ..."
        MemLimits="$(echo ${VCAP_APPLICATION} | $JQ_HOME/jq '.limits.mem')"

        echo "--> container memory limit = ${MemLimits}m"
        if [ -n "$K_BP_NODE_OPTS" ] || [ -z "$MemLimits" ] || [ -z "$K_BP_RESERVED_MEMORY" ] || [ -z "$K_BP_HEAP_PERCENTAGE" ] ; then
            export NODE_OPTIONS=$K_BP_NODE_OPTS
            echo "--> Using NODE_OPTIONS=\"${NODE_OPTIONS}\" (user defined)"
        else
            HeapSize=$(( ($MemLimits - $K_BP_RESERVED_MEMORY) / 100 * $K_BP_HEAP_PERCENTAGE ))
            export NODE_OPTIONS="--max-old-space-size=${HeapSize}"
            echo "--> Using NODE_OPTIONS=\"${NODE_OPTIONS}\" (calculated max heap size)"
        fi

        echo "--> preparing runtime directories ..."
        mkdir -p conf.d
        rm -rf kibana.conf.d kibana.config
        mkdir -p kibana.conf.d kibana.config

        echo "--> template processing ..."
        $GTE_HOME/gte $HOME/conf.d $HOME/kibana.conf.d
        $GTE_HOME/gte $K_ROOT/conf.d $HOME/kibana.conf.d

        echo "--> concatenating config files ..."
        awk 'FNR==1{print ""}1' $HOME/kibana.conf.d/* > $HOME/kibana.config/kibana.yml

        echo "--> STARTING KIBANA ..."
        if [ -n "$K_CMD_ARGS" ] ; then
            echo "--> using cmd_args=\"$K_CMD_ARGS\""
        fi

        if [ -n "$K_DO_SLEEP" ] ; then
            sleep 3600
        fi

        chmod +x $HOME/bin/*.sh
        $KIBANA_HOME/bin/kibana -c $HOME/kibana.config/kibana.yml $K_CMD_ARGS
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn writes_start_script_and_release() {
        let temp = TempDir::new().unwrap();
        let stager = stager(&temp);
        let mut staged = BTreeMap::new();
        staged.insert("KibanaVersion", "6.2.2");
        stager.write_config_yml(&staged).await.unwrap();

        let finalizer = Finalizer::new(stager, temp.path()).await.unwrap();
        assert_eq!(finalizer.kibana_version(), "6.2.2");
        finalizer.run().await.unwrap();

        let script = std::fs::read_to_string(temp.path().join("build/bin/run.sh")).unwrap();
        assert!(script.starts_with("echo \"--> STARTING UP ...\"\n"));
        assert!(script.contains("$KIBANA_HOME/bin/kibana -c"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(temp.path().join("build/bin/run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        let release: serde_yaml::Value = serde_yaml::from_str(
            &std::fs::read_to_string(temp.path().join(RELEASE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            release["default_process_types"]["web"].as_str(),
            Some("bin/run.sh")
        );
        assert!(temp.path().join("deps/0/profile.d/bin-path.sh").is_file());
    }

    #[tokio::test]
    async fn requires_supply_output() {
        let temp = TempDir::new().unwrap();
        let err = Finalizer::new(stager(&temp), temp.path())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BuildpackError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn requires_kibana_version() {
        let temp = TempDir::new().unwrap();
        let stager = stager(&temp);
        stager
            .write_config_yml(&BTreeMap::<&str, &str>::new())
            .await
            .unwrap();

        let err = Finalizer::new(stager, temp.path()).await.err().unwrap();
        assert!(matches!(err, BuildpackError::ConfigInvalid { .. }));
    }
}
