//! Integration tests for qjs-harness
//!
//! These tests drive the binary end to end against a throwaway project whose
//! "native executables" are `/bin/sh` and whose asset bundle holds shell scripts.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a qjs-harness Command with harness env vars cleared
fn harness() -> Command {
    let mut cmd = cargo_bin_cmd!("qjs-harness");
    cmd.env_remove("HARNESS_NATIVE_DIR")
        .env_remove("HARNESS_BUNDLE_DIR")
        .env_remove("HARNESS_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_bundle(project: &Path, files: &[(&str, &str)]) {
    let bundle = project.join("bundle");
    fs::create_dir_all(&bundle).unwrap();
    let mut writer = zip::ZipWriter::new(fs::File::create(bundle.join("testassets.zip")).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    fs::write(bundle.join("testassets-5eed.crc32"), "").unwrap();
}

/// Project whose plan runs `pass.sh` (group smoke) and `fail.sh` (group broken)
fn create_shell_project() -> TempDir {
    let dir = create_temp_project();
    let harness_dir = dir.path().join(".harness");
    fs::create_dir_all(&harness_dir).unwrap();
    fs::write(
        harness_dir.join("harness.toml"),
        r#"
[paths]
native_dir = "/bin"
bundle_dir = "bundle"
executable_pattern = "{name}"

[[tests]]
group = "smoke"
executable = "sh"
args = "pass.sh"

[[tests]]
group = "broken"
executable = "sh"
args = "fail.sh"
"#,
    )
    .unwrap();
    write_bundle(
        dir.path(),
        &[
            ("pass.sh", "echo hello from pass\nexit 0\n"),
            ("fail.sh", "echo oops >&2\nexit 3\n"),
        ],
    );
    dir
}

fn transcript(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join(".harness/logs/log.txt")).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_harness_help() {
        harness()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("plan"));
    }

    #[test]
    fn test_harness_version() {
        harness().arg("--version").assert().success();
    }

    #[test]
    fn test_default_plan_listing() {
        let dir = create_temp_project();
        harness()
            .current_dir(dir.path())
            .arg("plan")
            .assert()
            .success()
            .stdout(predicate::str::contains("25 tests"))
            .stdout(predicate::str::contains("librun-test262.so"))
            .stdout(predicate::str::contains("qjs tests/test_closure.js"));
    }

    #[test]
    fn test_plan_group_filter() {
        let dir = create_temp_project();
        harness()
            .current_dir(dir.path())
            .args(["plan", "--group", "test262bn"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 tests"))
            .stdout(predicate::str::contains("qjs tests/test_op.js").not());
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_init_creates_file() {
        let dir = create_temp_project();
        harness()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created harness.toml"));

        let content = fs::read_to_string(dir.path().join(".harness/harness.toml")).unwrap();
        assert!(content.contains("executable_pattern = \"lib{name}.so\""));

        harness()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".harness")).unwrap();
        fs::write(
            dir.path().join(".harness/harness.toml"),
            "[log]\ncapacity = 0\n",
        )
        .unwrap();

        harness()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("capacity"));
    }

    #[test]
    fn test_config_show_uses_env_override() {
        let dir = create_temp_project();
        harness()
            .current_dir(dir.path())
            .env("HARNESS_NATIVE_DIR", "/opt/quickjs")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("native_dir = \"/opt/quickjs\""))
            .stdout(predicate::str::contains("built-in QuickJS plan (25 tests)"));
    }
}

// =============================================================================
// Run Tests
// =============================================================================

#[cfg(unix)]
mod run {
    use super::*;

    #[test]
    fn test_passing_group_succeeds() {
        let dir = create_shell_project();

        harness()
            .current_dir(dir.path())
            .args(["run", "--group", "smoke"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hello from pass"))
            .stdout(predicate::str::contains("TEST COMPLETE"));

        let log = transcript(&dir);
        assert!(log.contains("Need exact assets\n"));
        assert!(log.contains("** 1. sh pass.sh\n"));
        assert!(log.contains("EXIT CODE: 0\nPASSED\n"));
        assert!(log.contains("all tests passed\n"));
        assert!(dir.path().join(".harness/testassets/pass.sh").exists());
        assert!(dir.path().join(".harness/logs/results.json").exists());
    }

    #[test]
    fn test_failing_test_fails_the_run() {
        let dir = create_shell_project();

        harness()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("1 of 2 tests failed"));

        let log = transcript(&dir);
        assert!(log.contains("** 2. sh fail.sh\n"));
        assert!(log.contains("oops\nEXIT CODE: 3\nFAILED\n"));
        assert!(log.contains("1 tests failed\nsh fail.sh\n"));
        assert!(log.ends_with("TEST COMPLETE\n"));

        let report = fs::read_to_string(dir.path().join(".harness/logs/results.json")).unwrap();
        assert!(report.contains("\"exit_code\": 3"));
    }

    #[test]
    fn test_second_run_reuses_assets() {
        let dir = create_shell_project();
        for _ in 0..2 {
            harness()
                .current_dir(dir.path())
                .args(["run", "-g", "smoke"])
                .assert()
                .success();
        }
        assert!(transcript(&dir).contains("All test assets are UP-TO-DATE\n"));
    }

    #[test]
    fn test_missing_bundle_interrupts_run() {
        let dir = create_shell_project();
        fs::remove_dir_all(dir.path().join("bundle")).unwrap();

        harness()
            .current_dir(dir.path())
            .arg("run")
            .assert()
            .failure()
            .stdout(predicate::str::contains("TEST INTERRUPT"))
            .stderr(predicate::str::contains("Test run interrupted"));

        let log = transcript(&dir);
        assert!(log.contains("Failed to prepare test assets\n"));
        assert!(!log.contains("** 1."));
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let dir = create_shell_project();
        harness()
            .current_dir(dir.path())
            .args(["run", "--group", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No tests to run"));
    }
}
