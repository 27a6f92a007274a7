//! Canonical task representation and normalization
//!
//! Manifest dialects produce heterogeneous task shapes (bare string, list of
//! steps, structured record). This module folds all of them into a single
//! canonical [`Task`] so the resolver and executor stay monomorphic.

use crate::config::env_file::load_env_file;
use crate::config::types::{CmdValue, TaskValue};
use crate::error::{ManifestError, ManifestResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Canonical task record
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Task name, unique within a manifest
    pub name: String,

    /// Single-line description shown by `--list`
    pub help: Option<String>,

    /// Working directory override, relative to the manifest root
    pub cwd: Option<PathBuf>,

    /// Environment overlay; the task's env file is already merged beneath it
    pub env: HashMap<String, String>,

    /// Env file path, kept for display
    pub env_file: Option<PathBuf>,

    /// Continue past failing steps
    pub keep_going: bool,

    /// Use the command text exactly; no argument forwarding
    pub verbatim: bool,

    /// Task body; the variant also decides shell-vs-exec spawning
    pub body: TaskBody,
}

/// The body of a canonical task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskBody {
    /// One command line, run through a shell
    Shell(String),

    /// An argv spawned directly, without a shell
    Exec(Vec<String>),

    /// Composite: an ordered list of steps
    Steps(Vec<Step>),
}

/// One element of a composite body
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Explicit `+pattern` reference
    Include(String),

    /// `-pattern` or `!pattern` filter applied to preceding references
    Exclude(String),

    /// Bare element: exact task name wins, then glob pattern, else an
    /// inline shell command
    Auto(String),
}

impl Task {
    /// Normalize a raw manifest value into a canonical task.
    ///
    /// `root` is the manifest directory; env files resolve against it.
    pub fn from_value(name: &str, value: TaskValue, root: &Path) -> ManifestResult<Self> {
        validate_name(name)?;

        match value {
            TaskValue::Command(text) => Ok(Task {
                name: name.to_string(),
                help: None,
                cwd: None,
                env: HashMap::new(),
                env_file: None,
                keep_going: false,
                verbatim: false,
                body: TaskBody::Shell(text),
            }),

            TaskValue::Steps(items) => Ok(Task {
                name: name.to_string(),
                help: None,
                cwd: None,
                env: HashMap::new(),
                env_file: None,
                keep_going: false,
                verbatim: false,
                body: TaskBody::Steps(items.into_iter().map(parse_step).collect()),
            }),

            TaskValue::Detail(detail) => {
                if let Some(key) = detail.unknown.keys().next() {
                    return Err(ManifestError::UnknownTaskKey {
                        task: name.to_string(),
                        key: key.clone(),
                    });
                }

                let body_keys = usize::from(detail.shell.is_some())
                    + usize::from(detail.cmd.is_some())
                    + usize::from(detail.composite.is_some());
                if body_keys > 1 {
                    return Err(ManifestError::AmbiguousTaskBody(name.to_string()));
                }

                let body = if let Some(text) = detail.shell {
                    TaskBody::Shell(text)
                } else if let Some(cmd) = detail.cmd {
                    let argv = match cmd {
                        CmdValue::Line(line) => {
                            shell_words::split(&line).map_err(|e| ManifestError::InvalidTask {
                                task: name.to_string(),
                                detail: format!("unparsable cmd: {}", e),
                            })?
                        }
                        CmdValue::Argv(argv) => argv,
                    };
                    if argv.is_empty() {
                        return Err(ManifestError::InvalidTask {
                            task: name.to_string(),
                            detail: "cmd is empty".to_string(),
                        });
                    }
                    TaskBody::Exec(argv)
                } else if let Some(items) = detail.composite {
                    TaskBody::Steps(items.into_iter().map(parse_step).collect())
                } else {
                    return Err(ManifestError::EmptyTaskBody(name.to_string()));
                };

                // Env file values sit beneath explicit env entries.
                let env_file = detail.env_file.map(|p| root.join(p));
                let mut env = match &env_file {
                    Some(path) => load_env_file(path)?,
                    None => HashMap::new(),
                };
                env.extend(detail.env);

                Ok(Task {
                    name: name.to_string(),
                    help: detail.help,
                    cwd: detail.cwd.map(PathBuf::from),
                    env,
                    env_file,
                    keep_going: detail.keep_going,
                    verbatim: detail.verbatim,
                    body,
                })
            }
        }
    }

    /// Whether `--list` should hide this task.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('_')
    }
}

fn validate_name(name: &str) -> ManifestResult<()> {
    // Glob characters are reserved for composite references.
    if name.is_empty()
        || name.chars().any(char::is_whitespace)
        || name.contains(['*', '?', '['])
    {
        return Err(ManifestError::InvalidTaskName(name.to_string()));
    }
    Ok(())
}

fn parse_step(raw: String) -> Step {
    if let Some(rest) = raw.strip_prefix('+') {
        Step::Include(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix('-') {
        Step::Exclude(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix('!') {
        Step::Exclude(rest.to_string())
    } else {
        Step::Auto(raw)
    }
}
