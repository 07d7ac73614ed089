//! Integration tests for the `modload` binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn modload(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modload"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .env_remove("MODLOAD_LOG")
        .output()
        .expect("failed to spawn modload")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_run_prints_exports_as_json() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("main.js"),
        "const data = require('./data'); module.exports = { total: data.a + data.b };",
    )
    .unwrap();
    fs::write(temp_dir.path().join("data.json"), "{\"a\": 40, \"b\": 2}").unwrap();

    let output = modload(&["run", "./main"], temp_dir.path());
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let printed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(printed, serde_json::json!({"total": 42}));
}

#[test]
fn test_run_uses_manifest_main() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("modload.toml"),
        "[package]\nname = \"demo\"\nmain = \"./entry\"\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("entry.js"), "exports.ok = true;").unwrap();

    let output = modload(&["run"], temp_dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).contains("\"ok\": true"));
}

#[test]
fn test_run_with_base_flag() {
    let temp_dir = TempDir::new().unwrap();
    let app = temp_dir.path().join("app");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("value.json"), "[1, 2]").unwrap();

    let output = modload(&["run", "./value", "--base", "app"], temp_dir.path());
    assert!(output.status.success());
    let printed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(printed, serde_json::json!([1, 2]));
}

#[test]
fn test_missing_module_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = modload(&["run", "./ghost"], temp_dir.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot find module './ghost'"), "stderr: {}", stderr);
}

#[test]
fn test_resolve_prints_path() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("lib.js"), "").unwrap();
    fs::write(temp_dir.path().join("lib.json"), "{}").unwrap();

    let output = modload(&["resolve", "./lib"], temp_dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).trim().ends_with("lib.js"));

    let output = modload(&["resolve", "./lib", "--ext", ".json"], temp_dir.path());
    assert!(stdout(&output).trim().ends_with("lib.json"));
}

#[test]
fn test_print_output_precedes_exports() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("hi.js"), "print('hello'); exports.done = 1;").unwrap();

    let output = modload(&["run", "./hi"], temp_dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("hello\n{"));
}
