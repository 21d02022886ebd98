//! CLI end-to-end tests
//!
//! Tests for the segmerge command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the segmerge binary
#[allow(deprecated)]
fn segmerge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("segmerge").unwrap();
    // Default log filter only
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_segments(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"ts").unwrap();
    }
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = segmerge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = segmerge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("segmerge"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("classify"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = segmerge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("segmerge "));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = segmerge_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_merge_requires_inputs() {
    let mut cmd = segmerge_cmd();
    cmd.arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("INPUTS"));
}

#[test]
fn test_cli_classify_numbered() {
    let mut cmd = segmerge_cmd();
    cmd.args(["classify", "seg001.ts", "bak3_seg001.ts", "Bak_old.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("main\tseg001.ts"))
        .stdout(predicate::str::contains("bak3\tbak3_seg001.ts"))
        .stdout(predicate::str::contains("bak\tBak_old.ts"));
}

#[test]
fn test_cli_classify_binary() {
    let mut cmd = segmerge_cmd();
    cmd.args(["classify", "--taxonomy", "binary", "bak3_seg001.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bak\tbak3_seg001.ts"));
}

#[test]
fn test_cli_classify_rejects_unknown_taxonomy() {
    let mut cmd = segmerge_cmd();
    cmd.args(["classify", "--taxonomy", "flat", "a.ts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown taxonomy"));
}

#[test]
fn test_cli_plan_json() {
    let dir = tempdir().unwrap();
    write_segments(
        dir.path(),
        &[
            "x_testpagerec3000_4000.ts",
            "x_testpagerec1000_2000.ts",
            "bak0_x_testpagerec500_900.ts",
        ],
    );

    let mut cmd = segmerge_cmd();
    let output = cmd
        .args(["plan", "--json", "--output", "out.mp4"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let groups = plan["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["tag"], "main");
    assert_eq!(groups[0]["mode"], "concat");
    assert_eq!(groups[0]["segments"][0]["offset"], 1.0);
    assert_eq!(groups[0]["segments"][0]["source"], "filename");
    assert_eq!(groups[1]["tag"], "bak0");
    assert_eq!(groups[1]["mode"], "stream_copy");
    assert_eq!(plan["final"]["mode"], "concat_transcode");
    assert_eq!(plan["final"]["output"], "out.mp4");
}

#[test]
fn test_cli_plan_text() {
    let dir = tempdir().unwrap();
    write_segments(dir.path(), &["b_testpagerec2000_3000.ts", "a_testpagerec1000_2000.ts"]);

    let mut cmd = segmerge_cmd();
    cmd.arg("plan")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Group main (2 segment(s)"))
        .stdout(predicate::str::contains(
            "[main] 1. a_testpagerec1000_2000.ts (offset: 1.000000s)",
        ))
        .stdout(predicate::str::contains("Final (DirectConversion)"));
}

#[test]
fn test_cli_plan_without_segments_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = segmerge_cmd();
    cmd.arg("plan")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Empty input"));
}

#[test]
fn test_cli_merge_dry_run() {
    let captures = tempdir().unwrap();
    write_segments(
        captures.path(),
        &["x_testpagerec1000_2000.ts", "bak_x_testpagerec1000_2000.ts"],
    );
    let scratch = tempdir().unwrap();

    let mut cmd = segmerge_cmd();
    cmd.arg("merge")
        .arg("--dry-run")
        .arg("--work-dir")
        .arg(scratch.path().join("work"))
        .arg(captures.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would merge 2 segment(s)"))
        .stdout(predicate::str::contains("Group bak"));

    // Dry runs still clean up the work directory
    assert!(!scratch.path().join("work").exists());
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("segmerge.toml");
    fs::write(
        &path,
        "[merge]\noutput = \"joined.mp4\"\ntaxonomy = \"binary\"\n",
    )
    .unwrap();

    let mut cmd = segmerge_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Taxonomy: binary"));
}

#[test]
fn test_cli_validate_rejects_bad_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("segmerge.toml");
    fs::write(&path, "[encode]\ncrf = 99\n").unwrap();

    let mut cmd = segmerge_cmd();
    cmd.arg("validate").arg(&path).assert().failure();
}
