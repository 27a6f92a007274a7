//! Integration tests for manifest discovery and parsing

mod common;

use common::{create_manifest, create_manifest_in_subdir};
use drs::config::{find_manifest, load_manifest_path, Dialect, OsFiles, TaskBody};
use drs::error::ManifestError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_complete_manifest() {
    let (_dir, path) = create_manifest(
        r#"
[tasks]
build = "cargo build"
test = { shell = "cargo test", help = "Run the test suite" }
release = { cmd = ["cargo", "build", "--release"], help = "Release build" }
check = ["build", "test"]

[workspace]
members = ["crates/*"]
"#,
    );

    let manifest = load_manifest_path(&path).unwrap();

    assert_eq!(manifest.names(), ["build", "test", "release", "check"]);
    assert_eq!(manifest.members, ["crates/*"]);

    let build = manifest.get("build").unwrap();
    assert_eq!(build.body, TaskBody::Shell("cargo build".into()));

    let test = manifest.get("test").unwrap();
    assert_eq!(test.help.as_deref(), Some("Run the test suite"));

    let release = manifest.get("release").unwrap();
    assert!(matches!(release.body, TaskBody::Exec(_)));

    let check = manifest.get("check").unwrap();
    assert!(matches!(check.body, TaskBody::Steps(ref steps) if steps.len() == 2));
}

#[test]
fn test_discover_from_subdir() {
    let (dir, path, sub) = create_manifest_in_subdir("[tasks]\nbuild = \"make\"\n");

    let found = find_manifest(&sub, &OsFiles).unwrap();
    assert_eq!(found.path, path);
    assert_eq!(found.dialect, Dialect::DrsToml);
    drop(dir);
}

#[test]
fn test_discover_prefers_pyproject() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("pyproject.toml"),
        "[tool.drs.tasks]\nfmt = \"ruff format\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("drs.toml"), "[tasks]\nfmt = \"other\"\n").unwrap();

    let found = find_manifest(dir.path(), &OsFiles).unwrap();
    assert_eq!(found.dialect, Dialect::PyProject);
}

#[test]
fn test_discover_skips_pyproject_without_tool_table() {
    let dir = TempDir::new().unwrap();
    let sub = dir.path().join("pkg");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("pyproject.toml"), "[project]\nname = \"x\"\n").unwrap();
    fs::write(dir.path().join("drs.toml"), "[tasks]\nbuild = \"make\"\n").unwrap();

    let found = find_manifest(&sub, &OsFiles).unwrap();
    assert_eq!(found.path, dir.path().join("drs.toml"));
}

#[test]
fn test_load_cargo_metadata_tasks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Cargo.toml");
    fs::write(
        &path,
        r#"
[package]
name = "demo"
version = "0.1.0"

[package.metadata.drs.tasks]
check = "cargo check"
ci = ["check"]
"#,
    )
    .unwrap();

    let manifest = load_manifest_path(&path).unwrap();
    assert_eq!(manifest.names(), ["check", "ci"]);
}

#[test]
fn test_load_package_json_scripts_compat() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("package.json");
    fs::write(
        &path,
        r#"{
  "name": "demo",
  "scripts": {
    "build": "tsc -p .",
    "test": "vitest run"
  }
}"#,
    )
    .unwrap();

    let manifest = load_manifest_path(&path).unwrap();
    assert_eq!(manifest.names(), ["build", "test"]);

    // Compat mode: every script is a shell command.
    let build = manifest.get("build").unwrap();
    assert_eq!(build.body, TaskBody::Shell("tsc -p .".into()));
}

#[test]
fn test_unknown_task_key_rejected() {
    let (_dir, path) = create_manifest(
        "[tasks]\nt = { shell = \"true\", allow_fail = true }\n",
    );
    let result = load_manifest_path(&path);
    match result {
        Err(ManifestError::UnknownTaskKey { task, key }) => {
            assert_eq!(task, "t");
            assert_eq!(key, "allow_fail");
        }
        other => panic!("expected UnknownTaskKey, got {:?}", other),
    }
}

#[test]
fn test_ambiguous_body_rejected() {
    let (_dir, path) = create_manifest(
        "[tasks]\nt = { shell = \"true\", composite = [\"other\"] }\nother = \"true\"\n",
    );
    assert!(matches!(
        load_manifest_path(&path),
        Err(ManifestError::AmbiguousTaskBody(_))
    ));
}

#[test]
fn test_empty_body_rejected() {
    let (_dir, path) = create_manifest("[tasks]\nt = { help = \"no body\" }\n");
    assert!(matches!(
        load_manifest_path(&path),
        Err(ManifestError::EmptyTaskBody(_))
    ));
}

#[test]
fn test_manifest_without_tasks_rejected() {
    let (_dir, path) = create_manifest("[tasks]\n");
    assert!(matches!(
        load_manifest_path(&path),
        Err(ManifestError::NoTasks(_))
    ));
}

#[test]
fn test_task_env_file_loaded_at_parse_time() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("service.env"), "PORT=8080\nHOST=localhost\n").unwrap();
    let path = dir.path().join("drs.toml");
    fs::write(
        &path,
        "[tasks]\nserve = { shell = \"true\", env_file = \"service.env\", env = { PORT = \"9090\" } }\n",
    )
    .unwrap();

    let manifest = load_manifest_path(&path).unwrap();
    let serve = manifest.get("serve").unwrap();

    // Explicit env wins over env_file values.
    assert_eq!(serve.env.get("PORT").unwrap(), "9090");
    assert_eq!(serve.env.get("HOST").unwrap(), "localhost");
}

#[test]
fn test_missing_env_file_is_an_error() {
    let (_dir, path) =
        create_manifest("[tasks]\nt = { shell = \"true\", env_file = \"absent.env\" }\n");
    assert!(matches!(
        load_manifest_path(&path),
        Err(ManifestError::EnvFile { .. })
    ));
}

#[test]
fn test_error_exit_codes() {
    use drs::DrsError;

    let (_dir, path) = create_manifest("[tasks]\n");
    let err: DrsError = load_manifest_path(&path).unwrap_err().into();
    assert_eq!(err.exit_code(), 2);

    let usage = DrsError::Usage("no task given".into());
    assert_eq!(usage.exit_code(), 1);
}
