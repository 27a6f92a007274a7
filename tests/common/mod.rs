//! Common test utilities

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory with a drs.toml file.
pub fn create_manifest(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let manifest_path = temp_dir.path().join("drs.toml");
    fs::write(&manifest_path, content).unwrap();
    (temp_dir, manifest_path)
}

/// Create a manifest with an empty subdirectory for discovery tests.
#[allow(dead_code)]
pub fn create_manifest_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let manifest_path = temp_dir.path().join("drs.toml");
    let sub_dir = temp_dir.path().join("subdir");

    fs::write(&manifest_path, content).unwrap();
    fs::create_dir(&sub_dir).unwrap();

    (temp_dir, manifest_path, sub_dir)
}
