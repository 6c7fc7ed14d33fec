//! Integration tests for weavr

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn weavr() -> Command {
        cargo_bin_cmd!("weavr")
    }

    #[test]
    fn help_displays() {
        weavr()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("weaving orchestrator"));
    }

    #[test]
    fn version_displays() {
        weavr()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("weavr"));
    }

    #[test]
    fn worker_is_hidden() {
        weavr()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Host an isolated context").not());
    }

    #[test]
    fn config_path() {
        weavr()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        weavr()
            .args(["--no-local", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("[discovery]"));
    }

    #[test]
    fn run_requires_target() {
        weavr()
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--target"));
    }

    #[test]
    fn run_help() {
        weavr()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Weave one or more build artifacts"));
    }
}

mod run_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated config and history for one test
    struct Sandbox {
        dir: TempDir,
        config: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("config.toml");
            let history = dir.path().join("history");
            fs::write(
                &config,
                format!("[history]\ndir = {:?}\n", history.display().to_string()),
            )
            .unwrap();
            Self { dir, config }
        }

        fn weavr(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("weavr");
            cmd.env("WEAVR_CONFIG", &self.config)
                .arg("--no-local")
                .current_dir(self.dir.path());
            cmd
        }

        fn workspace(&self, manifest: &str) -> PathBuf {
            let ws = self.dir.path().join("ws");
            fs::create_dir_all(ws.join(".weavr").join("addins")).unwrap();
            fs::write(ws.join("app.bin"), b"compiled").unwrap();
            fs::write(ws.join("weavr.toml"), manifest).unwrap();
            ws
        }
    }

    #[test]
    fn missing_target_aborts() {
        let sandbox = Sandbox::new();
        let ws = sandbox.workspace("[[plugin]]\nname = \"stamp\"\n");

        sandbox
            .weavr()
            .args(["run", "-t", "missing.bin", "-w"])
            .arg(&ws)
            .assert()
            .failure()
            .stderr(predicate::str::contains("target_path does not exist"))
            .stderr(predicate::str::contains("Finished weavr"));
    }

    #[test]
    fn no_plugins_configured_fails() {
        let sandbox = Sandbox::new();
        let ws = sandbox.workspace("");

        sandbox
            .weavr()
            .args(["run", "-t"])
            .arg(ws.join("app.bin"))
            .arg("-w")
            .arg(&ws)
            .assert()
            .failure()
            .stderr(predicate::str::contains("configured any plugins"));
    }

    #[test]
    fn history_starts_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .weavr()
            .args(["history", "show", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[cfg(unix)]
    fn install_plugin(ws: &Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = ws
            .join(".weavr")
            .join("addins")
            .join(format!("{}-weaver", name));
        fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn weaves_then_skips_until_artifact_changes() {
        let sandbox = Sandbox::new();
        let ws = sandbox.workspace("[[plugin]]\nname = \"stamp\"\n");
        install_plugin(
            &ws,
            "stamp",
            r#"echo woven >> app.bin
echo '{"severity":"warning","text":"stamped the artifact"}'"#,
        );
        let run = |sandbox: &Sandbox| {
            let mut cmd = sandbox.weavr();
            cmd.args(["run", "-t"])
                .arg(ws.join("app.bin"))
                .arg("-w")
                .arg(&ws);
            cmd
        };

        run(&sandbox)
            .assert()
            .success()
            .stderr(predicate::str::contains("stamp: stamped the artifact"));
        assert!(fs::read_to_string(ws.join("app.bin"))
            .unwrap()
            .contains("woven"));

        run(&sandbox)
            .assert()
            .success()
            .stderr(predicate::str::contains("stamped").not());

        sandbox
            .weavr()
            .args(["history", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("plugin stamp"));

        fs::write(ws.join("app.bin"), b"recompiled").unwrap();
        run(&sandbox)
            .assert()
            .success()
            .stderr(predicate::str::contains("stamped"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_plugin_fails_run_and_records_nothing() {
        let sandbox = Sandbox::new();
        let ws = sandbox.workspace("[[plugin]]\nname = \"broken\"\n");
        install_plugin(&ws, "broken", "echo 'cannot weave this'\nexit 2");

        sandbox
            .weavr()
            .args(["run", "-t"])
            .arg(ws.join("app.bin"))
            .arg("-w")
            .arg(&ws)
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot weave this"))
            .stderr(predicate::str::contains("failed to weave"));

        sandbox
            .weavr()
            .args(["history", "show", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn history_clear_reports_count() {
        let sandbox = Sandbox::new();
        sandbox
            .weavr()
            .args(["history", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 0 history record(s)"));
    }
}
