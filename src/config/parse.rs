//! Manifest discovery and parsing
//!
//! A manifest is found by walking upward from the working directory and
//! accepting the first file whose name and contents match a supported
//! dialect. Discovery is written against the [`FileSource`] trait so tests
//! can inject a virtual tree.

use crate::config::task::Task;
use crate::config::types::TaskValue;
use crate::error::{ManifestError, ManifestResult};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Supported manifest dialects, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `pyproject.toml` with a `[tool.drs.tasks]` table
    PyProject,

    /// `drs.toml` with a top-level `[tasks]` table
    DrsToml,

    /// `Cargo.toml` with `[package.metadata.drs.tasks]` or
    /// `[workspace.metadata.drs.tasks]`
    CargoToml,

    /// `package.json` with a `"scripts"` object (compat mode)
    PackageJson,
}

impl Dialect {
    /// All dialects in the order tried at each directory level.
    pub const ALL: [Dialect; 4] = [
        Dialect::PyProject,
        Dialect::DrsToml,
        Dialect::CargoToml,
        Dialect::PackageJson,
    ];

    /// The file name this dialect lives in.
    pub fn file_name(&self) -> &'static str {
        match self {
            Dialect::PyProject => "pyproject.toml",
            Dialect::DrsToml => "drs.toml",
            Dialect::CargoToml => "Cargo.toml",
            Dialect::PackageJson => "package.json",
        }
    }

    /// Infer a dialect from an explicit `--file` path.
    pub fn for_path(path: &Path) -> Dialect {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("pyproject.toml") => Dialect::PyProject,
            Some("Cargo.toml") => Dialect::CargoToml,
            Some("package.json") => Dialect::PackageJson,
            Some(name) if name.ends_with(".json") => Dialect::PackageJson,
            _ => Dialect::DrsToml,
        }
    }
}

/// Read access used during discovery.
pub trait FileSource {
    fn is_file(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// The real filesystem.
pub struct OsFiles;

impl FileSource for OsFiles {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// A discovered manifest file, not yet parsed into tasks.
#[derive(Debug)]
pub struct Discovered {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub contents: String,
}

/// A loaded project manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path to the source file
    pub path: PathBuf,

    /// Directory containing `path`; the default cwd for every task
    pub root: PathBuf,

    /// Canonical tasks by name
    pub tasks: HashMap<String, Task>,

    /// Task names in declaration order
    pub order: Vec<String>,

    /// Workspace member path globs, relative to `root`
    pub members: Vec<String>,
}

impl Manifest {
    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Task names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }
}

/// Walk upward from `start` and return the first matching manifest file.
pub fn find_manifest(start: &Path, source: &dyn FileSource) -> ManifestResult<Discovered> {
    let mut current = start.to_path_buf();
    let mut searched = Vec::new();

    loop {
        if let Some(found) = find_manifest_in(&current, source, &mut searched) {
            return Ok(found);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(ManifestError::NotFound(searched.join(", "))),
        }
    }
}

/// Check a single directory for a manifest, without walking upward.
///
/// Used for workspace members, which must carry their own manifest.
pub fn find_manifest_here(dir: &Path, source: &dyn FileSource) -> ManifestResult<Discovered> {
    let mut searched = Vec::new();
    find_manifest_in(dir, source, &mut searched)
        .ok_or_else(|| ManifestError::NotFound(searched.join(", ")))
}

fn find_manifest_in(
    dir: &Path,
    source: &dyn FileSource,
    searched: &mut Vec<String>,
) -> Option<Discovered> {
    for dialect in Dialect::ALL {
        let candidate = dir.join(dialect.file_name());
        searched.push(candidate.display().to_string());

        if !source.is_file(&candidate) {
            continue;
        }
        let Ok(contents) = source.read(&candidate) else {
            continue;
        };
        if dialect_matches(dialect, &contents) {
            return Some(Discovered {
                path: candidate,
                dialect,
                contents,
            });
        }
    }
    None
}

/// Whether file contents carry this dialect's tasks table.
fn dialect_matches(dialect: Dialect, contents: &str) -> bool {
    match dialect {
        Dialect::PackageJson => serde_json::from_str::<serde_json::Value>(contents)
            .ok()
            .map_or(false, |doc| doc.get("scripts").is_some()),
        _ => contents
            .parse::<toml::Value>()
            .ok()
            .map_or(false, |doc| toml_tasks_table(&doc, dialect).is_some()),
    }
}

/// Load a manifest from an explicit path (bypasses discovery).
pub fn load_manifest_path(path: &Path) -> ManifestResult<Manifest> {
    let contents = fs::read_to_string(path).map_err(|e| ManifestError::parse(path, e))?;
    let dialect = Dialect::for_path(path);
    parse_manifest(path, dialect, &contents)
}

/// Discover and load the manifest governing `cwd`.
pub fn load_manifest_auto(cwd: &Path) -> ManifestResult<Manifest> {
    let found = find_manifest(cwd, &OsFiles)?;
    parse_manifest(&found.path, found.dialect, &found.contents)
}

/// Parse manifest contents into canonical tasks.
pub fn parse_manifest(path: &Path, dialect: Dialect, contents: &str) -> ManifestResult<Manifest> {
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (raw_tasks, members) = match dialect {
        Dialect::PackageJson => extract_json(path, contents)?,
        _ => extract_toml(path, dialect, contents)?,
    };

    if raw_tasks.is_empty() {
        return Err(ManifestError::NoTasks(path.to_path_buf()));
    }

    let mut tasks = HashMap::new();
    let mut order = Vec::new();
    for (name, value) in raw_tasks {
        let task = Task::from_value(&name, value, &root)?;
        order.push(name.clone());
        tasks.insert(name, task);
    }

    Ok(Manifest {
        path: path.to_path_buf(),
        root,
        tasks,
        order,
        members,
    })
}

type RawTasks = Vec<(String, TaskValue)>;

fn extract_toml(
    path: &Path,
    dialect: Dialect,
    contents: &str,
) -> ManifestResult<(RawTasks, Vec<String>)> {
    let doc: toml::Value = contents
        .parse()
        .map_err(|e| ManifestError::parse(path, e))?;

    let mut raw = Vec::new();
    if let Some(table) = toml_tasks_table(&doc, dialect) {
        for (name, value) in table {
            let value: TaskValue = value.clone().try_into().map_err(|e| {
                ManifestError::parse(path, format!("task '{}': {}", name, e))
            })?;
            raw.push((name.clone(), value));
        }
    }

    Ok((raw, toml_members(&doc, dialect)))
}

fn extract_json(path: &Path, contents: &str) -> ManifestResult<(RawTasks, Vec<String>)> {
    let doc: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| ManifestError::parse(path, e))?;

    let mut raw = Vec::new();
    if let Some(scripts) = doc.get("scripts").and_then(|s| s.as_object()) {
        for (name, value) in scripts {
            let text = value.as_str().ok_or_else(|| {
                ManifestError::parse(path, format!("script '{}' is not a string", name))
            })?;
            // Compat mode: every script is a shell command.
            raw.push((name.clone(), TaskValue::Command(text.to_string())));
        }
    }

    let members = doc
        .get("workspaces")
        .and_then(|w| w.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok((raw, members))
}

fn toml_tasks_table(doc: &toml::Value, dialect: Dialect) -> Option<&toml::Table> {
    let table = match dialect {
        Dialect::PyProject => doc.get("tool")?.get("drs")?.get("tasks")?,
        Dialect::DrsToml => doc.get("tasks")?,
        Dialect::CargoToml => {
            let in_package = doc
                .get("package")
                .and_then(|p| p.get("metadata"))
                .and_then(|m| m.get("drs"))
                .and_then(|d| d.get("tasks"));
            let in_workspace = doc
                .get("workspace")
                .and_then(|w| w.get("metadata"))
                .and_then(|m| m.get("drs"))
                .and_then(|d| d.get("tasks"));
            in_package.or(in_workspace)?
        }
        Dialect::PackageJson => return None,
    };
    table.as_table()
}

fn toml_members(doc: &toml::Value, dialect: Dialect) -> Vec<String> {
    let members = match dialect {
        Dialect::PyProject => doc
            .get("tool")
            .and_then(|t| t.get("drs"))
            .and_then(|d| d.get("workspace"))
            .and_then(|w| w.get("members")),
        Dialect::DrsToml | Dialect::CargoToml => {
            doc.get("workspace").and_then(|w| w.get("members"))
        }
        Dialect::PackageJson => None,
    };

    members
        .and_then(|m| m.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::task::TaskBody;
    use std::collections::HashMap as Map;

    /// In-memory tree for discovery tests.
    struct VirtualTree {
        files: Map<PathBuf, String>,
    }

    impl VirtualTree {
        fn new(entries: &[(&str, &str)]) -> Self {
            VirtualTree {
                files: entries
                    .iter()
                    .map(|(p, c)| (PathBuf::from(p), c.to_string()))
                    .collect(),
            }
        }
    }

    impl FileSource for VirtualTree {
        fn is_file(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }

        fn read(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    #[test]
    fn test_find_in_start_dir() {
        let tree = VirtualTree::new(&[("/proj/drs.toml", "[tasks]\nbuild = \"make\"\n")]);
        let found = find_manifest(Path::new("/proj/sub/deep"), &tree).unwrap();
        assert_eq!(found.path, PathBuf::from("/proj/drs.toml"));
        assert_eq!(found.dialect, Dialect::DrsToml);
    }

    #[test]
    fn test_find_prefers_pyproject_at_same_level() {
        let tree = VirtualTree::new(&[
            (
                "/proj/pyproject.toml",
                "[tool.drs.tasks]\nbuild = \"make\"\n",
            ),
            ("/proj/drs.toml", "[tasks]\nbuild = \"make\"\n"),
        ]);
        let found = find_manifest(Path::new("/proj"), &tree).unwrap();
        assert_eq!(found.dialect, Dialect::PyProject);
    }

    #[test]
    fn test_find_skips_non_matching_contents() {
        // A pyproject.toml without [tool.drs.tasks] does not match; the walk
        // keeps going and picks up the parent drs.toml.
        let tree = VirtualTree::new(&[
            ("/proj/sub/pyproject.toml", "[tool.other]\nx = 1\n"),
            ("/proj/drs.toml", "[tasks]\nbuild = \"make\"\n"),
        ]);
        let found = find_manifest(Path::new("/proj/sub"), &tree).unwrap();
        assert_eq!(found.path, PathBuf::from("/proj/drs.toml"));
    }

    #[test]
    fn test_find_not_found_lists_searched() {
        let tree = VirtualTree::new(&[]);
        let result = find_manifest(Path::new("/proj"), &tree);
        match result {
            Err(ManifestError::NotFound(searched)) => {
                assert!(searched.contains("drs.toml"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_find_here_does_not_walk_up() {
        let tree = VirtualTree::new(&[("/proj/drs.toml", "[tasks]\nbuild = \"make\"\n")]);
        let result = find_manifest_here(Path::new("/proj/member"), &tree);
        assert!(matches!(result, Err(ManifestError::NotFound(_))));
    }

    #[test]
    fn test_parse_drs_toml() {
        let src = r#"
[tasks]
build = "cargo build"
test = { shell = "cargo test", help = "Run tests" }

[workspace]
members = ["crates/*"]
"#;
        let manifest =
            parse_manifest(Path::new("/proj/drs.toml"), Dialect::DrsToml, src).unwrap();
        assert_eq!(manifest.root, PathBuf::from("/proj"));
        assert_eq!(manifest.names(), ["build", "test"]);
        assert_eq!(manifest.members, ["crates/*"]);
        assert_eq!(
            manifest.get("test").unwrap().help.as_deref(),
            Some("Run tests")
        );
    }

    #[test]
    fn test_parse_pyproject() {
        let src = r#"
[project]
name = "demo"

[tool.drs.tasks]
fmt = "ruff format"

[tool.drs.workspace]
members = ["pkgs/a", "pkgs/b"]
"#;
        let manifest =
            parse_manifest(Path::new("/p/pyproject.toml"), Dialect::PyProject, src).unwrap();
        assert_eq!(manifest.names(), ["fmt"]);
        assert_eq!(manifest.members, ["pkgs/a", "pkgs/b"]);
    }

    #[test]
    fn test_parse_cargo_metadata() {
        let src = r#"
[package]
name = "demo"
version = "0.1.0"

[package.metadata.drs.tasks]
check = "cargo check"
"#;
        let manifest =
            parse_manifest(Path::new("/p/Cargo.toml"), Dialect::CargoToml, src).unwrap();
        assert_eq!(manifest.names(), ["check"]);
    }

    #[test]
    fn test_parse_package_json_compat() {
        let src = r#"{
  "name": "demo",
  "scripts": { "build": "tsc", "test": "vitest run" },
  "workspaces": ["packages/app"]
}"#;
        let manifest =
            parse_manifest(Path::new("/p/package.json"), Dialect::PackageJson, src).unwrap();
        assert_eq!(manifest.names(), ["build", "test"]);
        assert_eq!(manifest.members, ["packages/app"]);

        // Compat mode: scripts are shell commands.
        let build = manifest.get("build").unwrap();
        assert_eq!(build.body, TaskBody::Shell("tsc".into()));
    }

    #[test]
    fn test_parse_no_tasks() {
        let result = parse_manifest(Path::new("/p/drs.toml"), Dialect::DrsToml, "[tasks]\n");
        assert!(matches!(result, Err(ManifestError::NoTasks(_))));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_manifest(Path::new("/p/drs.toml"), Dialect::DrsToml, "not toml [");
        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn test_parse_non_string_script_rejected() {
        let src = r#"{ "scripts": { "oops": 42 } }"#;
        let result = parse_manifest(Path::new("/p/package.json"), Dialect::PackageJson, src);
        assert!(matches!(result, Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn test_order_follows_document() {
        let src = "[tasks]\nzeta = \"z\"\nalpha = \"a\"\nmid = \"m\"\n";
        let manifest =
            parse_manifest(Path::new("/p/drs.toml"), Dialect::DrsToml, src).unwrap();
        assert_eq!(manifest.names(), ["zeta", "alpha", "mid"]);
    }
}
