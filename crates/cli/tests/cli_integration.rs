//! CLI integration tests for the `run` and `resolve` subcommands.
//!
//! Uses `assert_cmd` to spawn the `modqa` binary against a throwaway
//! project layout. The test engine is a `sh` one-liner that records the
//! request it receives and prints a canned result.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project `MyMod` built as version 1.2.3, plus a task directory whose
/// `../Tests/QA` holds the test definitions.
struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        fs::create_dir_all(root.path().join("MyMod/source")).unwrap();
        fs::create_dir_all(root.path().join("MyMod/output/MyMod/1.2.3")).unwrap();
        fs::create_dir_all(root.path().join("tool/bin")).unwrap();
        Fixture { root }
    }

    fn project(&self) -> PathBuf {
        self.root.path().join("MyMod")
    }

    fn task_dir(&self) -> PathBuf {
        self.root.path().join("tool/bin")
    }

    fn qa_dir(&self) -> PathBuf {
        self.root.path().join("tool/Tests/QA")
    }

    fn request_file(&self) -> PathBuf {
        self.root.path().join("request.json")
    }

    fn write_definitions(&self, names: &[&str]) {
        fs::create_dir_all(self.qa_dir()).unwrap();
        for name in names {
            fs::write(self.qa_dir().join(name), "").unwrap();
        }
    }

    fn write_build_config(&self, text: &str) {
        fs::write(self.project().join("build.toml"), text).unwrap();
    }

    fn request(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(self.request_file()).unwrap()).unwrap()
    }

    /// `modqa <subcommand>` with the project and task dir wired in.
    fn modqa(&self, subcommand: &str) -> Command {
        let mut cmd = cargo_bin_cmd!("modqa");
        cmd.current_dir(self.root.path())
            .env_remove("RUST_LOG")
            .arg(subcommand)
            .arg("--project-path")
            .arg(self.project())
            .arg("--task-dir")
            .arg(self.task_dir());
        cmd
    }

    /// `modqa run` with a shell engine that saves its request and prints `result`.
    fn run_with_result(&self, result: &str) -> Command {
        let script = format!(
            "cat > '{}'; echo '{}'",
            self.request_file().display(),
            result
        );
        let mut cmd = self.modqa("run");
        cmd.args(["--engine", "sh", "--engine-arg", "-c", "--engine-arg"])
            .arg(script)
            .args(["--runtime-version", "7.4"]);
        cmd
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    cargo_bin_cmd!("modqa")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Module QA test task"));
}

#[test]
fn version_exits_0() {
    cargo_bin_cmd!("modqa")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("modqa"));
}

#[test]
fn run_requires_engine() {
    cargo_bin_cmd!("modqa")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--engine"));
}

// ──────────────────────────────────────────────
// 2. Run subcommand
// ──────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn run_without_definitions_still_writes_result() {
    let fx = Fixture::new();

    let assert = fx
        .run_with_result(r#"{"TotalCount": 0}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("QA_MyMod_v1.2.3."))
        .stdout(predicate::str::contains(".7.4.json"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let result_path = PathBuf::from(stdout.trim());
    assert!(result_path.starts_with(fx.project().join("output/testResults")));
    assert_eq!(read_json(&result_path)["TotalCount"], 0);

    let request = fx.request();
    assert_eq!(request["containers"].as_array().unwrap().len(), 0);
    assert_eq!(request["parameters"]["pass_thru"], true);
}

#[cfg(unix)]
#[test]
fn run_sends_all_definitions_with_shared_data() {
    let fx = Fixture::new();
    fx.write_definitions(&["Changelog.Tests.ps1", "ModuleQuality.Tests.ps1"]);
    fx.write_build_config(
        r#"
[qa.script]
main_git_branch = "develop"

[qa.engine]
pass_thru = false
exclude_tag = ["markdown"]
"#,
    );

    fx.run_with_result(r#"{"PassedCount": 2, "FailedCount": 0}"#)
        .args(["--pass-thru", "false"])
        .assert()
        .success();

    let request = fx.request();
    let containers = request["containers"].as_array().unwrap();
    assert_eq!(containers.len(), 2);
    assert!(containers[0]["path"]
        .as_str()
        .unwrap()
        .ends_with("Changelog.Tests.ps1"));
    for container in containers {
        assert_eq!(container["data"]["main_git_branch"], "develop");
        assert_eq!(
            container["data"]["source_path"],
            fx.project().join("source").to_str().unwrap()
        );
    }
    assert_eq!(request["parameters"]["pass_thru"], true);
    assert_eq!(request["parameters"]["exclude_tag"][0], "markdown");
}

#[cfg(unix)]
#[test]
fn explicit_branch_overrides_build_config() {
    let fx = Fixture::new();
    fx.write_definitions(&["a.Tests.ps1"]);
    fx.write_build_config("[qa.script]\nmain_git_branch = \"develop\"\n");

    fx.run_with_result("{}")
        .args(["--main-git-branch", "release"])
        .assert()
        .success();

    assert_eq!(
        fx.request()["containers"][0]["data"]["main_git_branch"],
        "release"
    );
}

#[cfg(unix)]
#[test]
fn failing_tests_exit_0_and_are_persisted() {
    let fx = Fixture::new();

    let assert = fx
        .run_with_result(r#"{"PassedCount": 4, "FailedCount": 2}"#)
        .args(["--output", "json"])
        .assert()
        .success();

    let summary: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(summary["failed"], 2);
    assert_eq!(summary["module_version"], "1.2.3");
    let written = read_json(Path::new(summary["result_file"].as_str().unwrap()));
    assert_eq!(written["FailedCount"], 2);
}

#[cfg(unix)]
#[test]
fn relative_test_output_folder_is_under_output_directory() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.project().join("build/MyMod/1.2.3")).unwrap();

    fx.run_with_result("{}")
        .args(["--output-directory", "build", "--test-output-folder", "qa"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            fx.project().join("build/qa").to_str().unwrap(),
        ));
    assert!(fx.project().join("build/qa").is_dir());
}

#[cfg(unix)]
#[test]
fn missing_built_module_fails() {
    let fx = Fixture::new();
    fs::remove_dir_all(fx.project().join("output/MyMod")).unwrap();

    fx.run_with_result("{}")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("module version"));
    assert!(!fx.request_file().exists());
}

#[cfg(unix)]
#[test]
fn engine_without_structured_result_fails() {
    let fx = Fixture::new();

    fx.modqa("run")
        .args(["--engine", "sh", "--engine-arg", "-c", "--engine-arg"])
        .arg("cat > /dev/null; echo plain text")
        .args(["--runtime-version", "7.4", "--output", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"engine\""));
}

// ──────────────────────────────────────────────
// 3. Resolve subcommand
// ──────────────────────────────────────────────

#[test]
fn resolve_json_reports_layout_without_writing() {
    let fx = Fixture::new();

    let assert = fx
        .modqa("resolve")
        .args(["--output", "json", "--output-directory", "out"])
        .assert()
        .success();

    let value: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let context = &value["context"];
    assert_eq!(
        context["output_directory"],
        fx.project().join("out").to_str().unwrap()
    );
    assert_eq!(
        context["test_output_folder"],
        fx.project().join("out/testResults").to_str().unwrap()
    );
    assert_eq!(context["project_name"], "MyMod");
    assert_eq!(context["parameters"]["script"]["main_git_branch"], "main");
    assert_eq!(context["parameters"]["engine"]["pass_thru"], true);
    assert!(value["module_version"].is_null());
    assert!(!fx.project().join("out").exists());
}

#[test]
fn resolve_text_shows_module_version_and_config_values() {
    let fx = Fixture::new();
    fx.write_build_config("[qa.engine]\ntag = [\"fast\", \"unit\"]\n");

    fx.modqa("resolve")
        .assert()
        .success()
        .stdout(predicate::str::contains("module_version:      1.2.3"))
        .stdout(predicate::str::contains("tag:                 fast, unit"))
        .stdout(predicate::str::contains("pass_thru:           true"));
}

#[test]
fn resolve_bad_build_config_fails_with_json_error() {
    let fx = Fixture::new();
    fx.write_build_config("[qa.script]\nmain_git_branch = 42\n");

    fx.modqa("resolve")
        .args(["--output", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\":\"config\""));
}

#[test]
fn resolve_relative_parent_project_path_names_the_project() {
    let fx = Fixture::new();
    let build_dir = fx.project().join("build");
    fs::create_dir_all(&build_dir).unwrap();

    let mut cmd = cargo_bin_cmd!("modqa");
    let assert = cmd
        .current_dir(&build_dir)
        .env_remove("RUST_LOG")
        .args(["resolve", "--output", "json", "--project-path", ".."])
        .arg("--task-dir")
        .arg(fx.task_dir())
        .assert()
        .success();

    let value: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(value["context"]["project_name"], "MyMod");
    assert_eq!(
        value["context"]["project_path"],
        fx.project().to_str().unwrap()
    );
    assert_eq!(value["module_version"], "1.2.3");
}

#[test]
fn resolve_root_project_path_without_name_fails() {
    let fx = Fixture::new();

    let mut cmd = cargo_bin_cmd!("modqa");
    cmd.current_dir(fx.root.path())
        .env_remove("RUST_LOG")
        .args(["resolve", "--output", "json", "--project-path", "/"])
        .arg("--task-dir")
        .arg(fx.task_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\":\"config\""));
}

// ──────────────────────────────────────────────
// 4. Diagnostics
// ──────────────────────────────────────────────

#[test]
fn debug_logging_names_the_winning_layer_per_key() {
    let fx = Fixture::new();
    fx.write_build_config(
        "[qa.script]\nexclude_source_file = [\"output\"]\n\n[qa.engine]\npass_thru = false\n",
    );

    fx.modqa("resolve")
        .args(["-vv", "--tag", "fast"])
        .assert()
        .success()
        .stderr(predicate::str::is_match(r#"key="?tag"?\s+layer=explicit"#).unwrap())
        .stderr(
            predicate::str::is_match(r#"key="?exclude_source_file"?\s+layer=config-file"#)
                .unwrap(),
        )
        .stderr(predicate::str::is_match(r#"key="?main_git_branch"?\s+layer=default"#).unwrap())
        .stderr(predicate::str::contains(
            "overriding configured pass_thru=false",
        ));
}

#[test]
fn default_verbosity_hides_resolution_events() {
    let fx = Fixture::new();

    fx.modqa("resolve")
        .assert()
        .success()
        .stderr(predicate::str::contains("resolved option").not());
}
