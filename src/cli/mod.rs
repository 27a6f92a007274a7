//! Command-line interface
//!
//! Flag parsing and task-invocation splitting, plus the top-level dispatch
//! from parsed arguments into the loader, resolver, and executor.

pub mod app;

// Re-export main types
pub use app::*;
