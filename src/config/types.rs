//! Raw manifest task shapes
//!
//! This module defines the structures a task value can take inside a manifest
//! before normalization: a bare command string, a list of steps, or a
//! structured record.

use serde::Deserialize;
use std::collections::HashMap;

/// A task value as it appears in a manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskValue {
    /// Bare command string, run through a shell
    Command(String),

    /// Ordered list of composite steps
    Steps(Vec<String>),

    /// Structured record with the full key set
    Detail(TaskDetail),
}

/// Structured task record
///
/// The recognized key set is closed; anything else lands in `unknown` and is
/// rejected during normalization so typos surface as errors.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDetail {
    /// Single-line description shown by `--list`
    pub help: Option<String>,

    /// Working directory override, relative to the manifest root
    pub cwd: Option<String>,

    /// Environment variables merged over the inherited environment
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// File of KEY=VALUE lines merged beneath `env`
    pub env_file: Option<String>,

    /// Continue past failing steps
    #[serde(default)]
    pub keep_going: bool,

    /// Use the command text exactly; no argument forwarding
    #[serde(default)]
    pub verbatim: bool,

    /// Body: one command line run through a shell
    pub shell: Option<String>,

    /// Body: a command exec'd directly, without a shell
    pub cmd: Option<CmdValue>,

    /// Body: an ordered list of composite steps
    pub composite: Option<Vec<String>>,

    /// Unrecognized keys, collected for rejection
    #[serde(flatten)]
    pub unknown: HashMap<String, toml::Value>,
}

/// A `cmd` body: a single line to tokenize, or an argv given directly
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CmdValue {
    Line(String),
    Argv(Vec<String>),
}
