//! Integration tests for the kibana-buildpack binary

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn buildpack() -> Command {
        let mut cmd = cargo_bin_cmd!("kibana-buildpack");
        cmd.env_remove("BP_DEBUG")
            .env_remove("VCAP_SERVICES")
            .env_remove("VCAP_APPLICATION");
        cmd
    }

    fn stage_args(root: &Path) -> Vec<String> {
        ["build", "cache", "deps"]
            .iter()
            .map(|d| root.join(d).display().to_string())
            .chain(std::iter::once("0".to_string()))
            .collect()
    }

    #[test]
    fn help_displays() {
        buildpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("supply"))
            .stdout(predicate::str::contains("finalize"));
    }

    #[test]
    fn version_displays() {
        buildpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("kibana-buildpack"));
    }

    #[test]
    fn supply_requires_directories() {
        buildpack().args(["supply", "only-one"]).assert().failure();
    }

    #[test]
    fn supply_without_kibana_file_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("build")).unwrap();
        std::fs::write(temp.path().join("manifest.yml"), "language: kibana\n").unwrap();

        buildpack()
            .arg("--buildpack-dir")
            .arg(temp.path())
            .arg("supply")
            .args(stage_args(temp.path()))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn supply_rejects_malformed_services() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("build")).unwrap();
        std::fs::write(temp.path().join("manifest.yml"), "language: kibana\n").unwrap();

        buildpack()
            .env("BUILDPACK_DIR", temp.path())
            .env("VCAP_SERVICES", "{broken")
            .arg("supply")
            .args(stage_args(temp.path()))
            .assert()
            .failure()
            .stderr(predicate::str::contains("VCAP_SERVICES"));
    }

    #[test]
    fn finalize_without_supply_fails() {
        let temp = TempDir::new().unwrap();

        buildpack()
            .arg("--buildpack-dir")
            .arg(temp.path())
            .arg("finalize")
            .args(stage_args(temp.path()))
            .assert()
            .failure()
            .stderr(predicate::str::contains("config.yml"));
    }

    #[test]
    fn finalize_writes_start_script() {
        let temp = TempDir::new().unwrap();
        let dep_dir = temp.path().join("deps").join("0");
        std::fs::create_dir_all(&dep_dir).unwrap();
        std::fs::create_dir_all(temp.path().join("build")).unwrap();
        std::fs::write(
            dep_dir.join("config.yml"),
            "name: kibana\nconfig:\n  KibanaVersion: 6.2.2\n",
        )
        .unwrap();

        buildpack()
            .arg("--buildpack-dir")
            .arg(temp.path())
            .arg("finalize")
            .args(stage_args(temp.path()))
            .assert()
            .success()
            .stdout(predicate::str::contains("6.2.2"));

        assert!(temp.path().join("build/bin/run.sh").is_file());
        assert!(dep_dir.join("profile.d/bin-path.sh").is_file());
    }
}
