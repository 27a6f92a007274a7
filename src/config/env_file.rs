//! Env-file parsing
//!
//! Env files are plain `KEY=VALUE` lines. Blank lines and `#` comments are
//! skipped, a leading `export ` is tolerated, and matching single or double
//! quotes around the value are stripped.

use crate::error::{ManifestError, ManifestResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parse env-file contents into a map.
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    vars
}

/// Read and parse an env file from disk.
pub fn load_env_file(path: &Path) -> ManifestResult<HashMap<String, String>> {
    let contents = fs::read_to_string(path).map_err(|e| ManifestError::EnvFile {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(parse_env_file(&contents))
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
