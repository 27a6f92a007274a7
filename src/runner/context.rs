//! Execution context
//!
//! The context carries the invocation-level state shared by every step:
//! dry-run mode, command-line environment overrides, workspace selection,
//! and output verbosity.

use std::collections::HashMap;

/// Invocation-level execution state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Print the plan instead of spawning processes
    pub dry_run: bool,

    /// Environment overrides from `--env` / `--env-file`; applied over
    /// every step's environment
    pub env: HashMap<String, String>,

    /// Workspace member patterns from `--workspace`
    pub workspace: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for runner output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// One task requested on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Task name
    pub name: String,

    /// Extra arguments forwarded to the task
    pub args: Vec<String>,

    /// Continue past this invocation's failure (`+name` prefix)
    pub keep_going: bool,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Invocation {
            name: name.into(),
            args: Vec::new(),
            keep_going: false,
        }
    }
}

impl Context {
    /// Create a context with default settings.
    pub fn new() -> Self {
        Context::default()
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set environment overrides.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set workspace patterns.
    pub fn with_workspace(mut self, workspace: Vec<String>) -> Self {
        self.workspace = workspace;
        self
    }

    /// Set verbosity level.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Print a step announcement.
    pub fn print_run(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("[RUN] {}", message);
        }
    }

    /// Print an informational message.
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("[INFO] {}", message);
        }
    }

    /// Print an error message.
    pub fn print_error(&self, message: &str) {
        eprintln!("[ERROR] {}", message);
    }

    /// Print a debug message (only in verbose mode).
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("[DEBUG] {}", message);
        }
    }
}
