//! Error types for drs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for drs operations
pub type Result<T> = std::result::Result<T, DrsError>;

/// Main error type for drs
#[derive(Error, Debug)]
pub enum DrsError {
    /// Command-line usage errors
    #[error("{0}")]
    Usage(String),

    /// Manifest loading and normalization errors
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    /// Task resolution errors
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DrsError {
    /// Process exit code for this error.
    ///
    /// Usage errors exit 1; manifest and resolution errors exit 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            DrsError::Usage(_) => 1,
            DrsError::Manifest(_) | DrsError::Resolve(_) => 2,
            DrsError::Io(_) => 1,
        }
    }
}

/// Manifest discovery, parsing, and normalization errors
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no manifest found (searched: {0})")]
    NotFound(String),

    #[error("failed to parse {}: {}", .path.display(), .detail)]
    Parse { path: PathBuf, detail: String },

    #[error("{}: manifest defines no tasks", .0.display())]
    NoTasks(PathBuf),

    #[error("task '{task}': unknown key '{key}'")]
    UnknownTaskKey { task: String, key: String },

    #[error("task '{0}': more than one of 'shell', 'cmd', 'composite' given")]
    AmbiguousTaskBody(String),

    #[error("task '{0}': one of 'shell', 'cmd', 'composite' is required")]
    EmptyTaskBody(String),

    #[error("invalid task name '{0}'")]
    InvalidTaskName(String),

    #[error("task '{task}': {detail}")]
    InvalidTask { task: String, detail: String },

    #[error("failed to read env file {}: {}", .path.display(), .detail)]
    EnvFile { path: PathBuf, detail: String },
}

/// Task resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("task '{0}' is not defined")]
    UnknownTask(String),

    #[error("circular task reference: {0}")]
    CyclicTask(String),

    #[error("pattern '{0}' matched no tasks")]
    PatternMatchedNothing(String),

    #[error("bad placeholder in '{template}': {detail}")]
    BadPlaceholder { template: String, detail: String },

    #[error("invalid pattern '{pattern}': {detail}")]
    BadPattern { pattern: String, detail: String },
}

/// Specialized result type for manifest operations
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Specialized result type for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

impl ManifestError {
    /// Build a parse error from anything displayable.
    pub fn parse(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        ManifestError::Parse {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}
