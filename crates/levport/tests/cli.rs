//! End-to-end tests of the levport binary.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

fn levport() -> Command {
    Command::cargo_bin("levport").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_single_file_to_stdout() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "room.lua", "des.room({ type = \"ordinary\" })\n");

    let output = levport()
        .current_dir(dir.path())
        .arg("room.lua")
        .output()
        .expect("failed to execute levport");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("// Generated by levport from room.lua."));
    assert!(stdout.contains("export function generate() {"));
    assert!(stdout.contains("des.room({ type: \"ordinary\" });"));
}

#[test]
fn test_single_file_to_output_path() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "room.lua", "des.room()\n");

    levport()
        .current_dir(dir.path())
        .args(["room.lua", "room.js"])
        .assert()
        .success();

    let js = std::fs::read_to_string(dir.path().join("room.js")).unwrap();
    assert!(js.ends_with("  return finalize_level();\n}\n"));
}

#[test]
fn test_fatal_diagnostic_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.lua", "for i = 1, rnd(3) do add(i) end\n");

    let output = levport()
        .current_dir(dir.path())
        .args(["bad.lua", "bad.js"])
        .output()
        .expect("failed to execute levport");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.lua:1: error[lower]: random draw"));
    assert!(!dir.path().join("bad.js").exists());
}

#[test]
fn test_config_file_changes_entry() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "room.lua", "des.room()\n");
    write(dir.path(), "levport.toml", "[output]\nentry = \"build\"\n");

    let output = levport()
        .current_dir(dir.path())
        .arg("room.lua")
        .output()
        .expect("failed to execute levport");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("export function build() {"));
}

#[test]
fn test_batch_mode() {
    let dir = TempDir::new().unwrap();
    let levels = dir.path().join("levels");
    std::fs::create_dir(&levels).unwrap();
    write(&levels, "a.lua", "des.room()\n");
    write(&levels, "b.lua", "des.map([[\n...\n]])\n");
    write(&levels, "themerms.lua", "themes = {}\n");

    let output = levport()
        .current_dir(dir.path())
        .args(["--batch", "levels", "out", "--jobs", "2"])
        .output()
        .expect("failed to execute levport");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok    a.lua"));
    assert!(stdout.contains("skip  themerms.lua"));
    assert!(stdout.contains("2 translated, 0 failed, 1 skipped"));
    assert!(dir.path().join("out/a.js").is_file());
    assert!(dir.path().join("out/b.js").is_file());
}

#[test]
fn test_batch_json_report_and_failure_exit() {
    let dir = TempDir::new().unwrap();
    let levels = dir.path().join("levels");
    std::fs::create_dir(&levels).unwrap();
    write(&levels, "good.lua", "des.room()\n");
    write(&levels, "bad.lua", "local t = { 1, x = 2 }\n");

    let output = levport()
        .current_dir(dir.path())
        .args(["--batch", "levels", "out", "--json"])
        .output()
        .expect("failed to execute levport");

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["translated"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["files"][0]["name"], "bad.lua");
    assert_eq!(report["files"][0]["status"], "failed");
    assert_eq!(report["files"][0]["diagnostics"][0]["severity"], "fatal");
    assert_eq!(report["files"][1]["status"], "translated");
}

#[test]
fn test_batch_without_output_dir_is_an_error() {
    let dir = TempDir::new().unwrap();
    levport()
        .current_dir(dir.path())
        .args(["--batch", "."])
        .assert()
        .failure();
}
