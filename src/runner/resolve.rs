//! Task resolution
//!
//! Converts a requested task name plus caller arguments into a flat,
//! ordered execution plan. Composite bodies expand here: glob references
//! match the task table, negative filters prune the accumulated set, and a
//! name stack guards against reference cycles.

use crate::config::{Manifest, Step, TaskBody};
use crate::error::{ResolveError, ResolveResult};
use crate::runner::args::{forward_argv, forward_shell};
use globset::{Glob, GlobMatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A resolved, ordered execution plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

/// One resolved step of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    /// Name of the task that produced this step
    pub task: String,

    /// Resolved command
    pub command: StepCommand,

    /// Absolute working directory
    pub cwd: PathBuf,

    /// Task-layer environment overlay (merged parent chain); the process
    /// environment is applied underneath at spawn time
    pub env: HashMap<String, String>,

    /// Continue past this step's failure
    pub keep_going: bool,
}

/// The command form of a plan step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepCommand {
    /// One command line, run through a shell
    Shell(String),

    /// An argv spawned directly
    Exec(Vec<String>),
}

impl StepCommand {
    /// Single-line rendering for dry runs and step announcements.
    pub fn display(&self) -> String {
        match self {
            StepCommand::Shell(text) => text.clone(),
            StepCommand::Exec(argv) => shell_words::join(argv.iter().map(String::as_str)),
        }
    }
}

/// Resolve `(name, args)` against a manifest into a plan.
///
/// Resolution is a pure function of its inputs; no process is spawned and
/// nothing on disk is touched.
pub fn resolve(manifest: &Manifest, name: &str, args: &[String]) -> ResolveResult<Plan> {
    let mut plan = Plan::default();
    let mut stack = Vec::new();
    expand(
        manifest,
        name,
        args,
        &mut stack,
        &HashMap::new(),
        None,
        &mut plan.steps,
    )?;
    Ok(plan)
}

fn expand(
    manifest: &Manifest,
    name: &str,
    args: &[String],
    stack: &mut Vec<String>,
    inherited_env: &HashMap<String, String>,
    inherited_cwd: Option<&Path>,
    out: &mut Vec<PlanStep>,
) -> ResolveResult<()> {
    if stack.iter().any(|entry| entry == name) {
        let mut path = stack.join(" -> ");
        path.push_str(" -> ");
        path.push_str(name);
        return Err(ResolveError::CyclicTask(path));
    }

    let task = manifest
        .get(name)
        .ok_or_else(|| ResolveError::UnknownTask(name.to_string()))?;

    // Env and cwd layer downward: process env under parent env under ours.
    let mut env = inherited_env.clone();
    env.extend(task.env.clone());
    let cwd = match &task.cwd {
        Some(dir) => manifest.root.join(dir),
        None => inherited_cwd
            .map(Path::to_path_buf)
            .unwrap_or_else(|| manifest.root.clone()),
    };

    match &task.body {
        TaskBody::Shell(template) => {
            let text = if task.verbatim {
                template.clone()
            } else {
                forward_shell(template, args)?
            };
            out.push(PlanStep {
                task: name.to_string(),
                command: StepCommand::Shell(text),
                cwd,
                env,
                keep_going: task.keep_going,
            });
        }

        TaskBody::Exec(argv) => {
            let argv = if task.verbatim {
                argv.clone()
            } else {
                forward_argv(argv, args)?
            };
            out.push(PlanStep {
                task: name.to_string(),
                command: StepCommand::Exec(argv),
                cwd,
                env,
                keep_going: task.keep_going,
            });
        }

        TaskBody::Steps(steps) => {
            let entries = accumulate(manifest, steps)?;

            stack.push(name.to_string());
            for entry in entries {
                match entry {
                    Entry::Inline(text) => out.push(PlanStep {
                        task: name.to_string(),
                        command: StepCommand::Shell(text),
                        cwd: cwd.clone(),
                        env: env.clone(),
                        keep_going: task.keep_going,
                    }),
                    // Composites are fixed-shape: no argument forwarding
                    // into sub-tasks.
                    Entry::Reference(sub) => {
                        expand(manifest, &sub, &[], stack, &env, Some(&cwd), out)?;
                    }
                }
            }
            stack.pop();
        }
    }

    Ok(())
}

/// One accumulated composite entry, in final order.
enum Entry {
    Reference(String),
    Inline(String),
}

/// Apply include/exclude set operations over a composite's steps.
///
/// Matching never interleaves with execution; the accumulator is complete
/// before anything expands.
fn accumulate(manifest: &Manifest, steps: &[Step]) -> ResolveResult<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut patterns: Vec<String> = Vec::new();
    let mut matched_any = false;

    for step in steps {
        match step {
            Step::Include(pattern) => {
                patterns.push(pattern.clone());
                matched_any |= include(manifest, pattern, true, &mut entries)?;
            }
            Step::Exclude(pattern) => exclude(pattern, &mut entries)?,
            Step::Auto(text) => {
                // Exact match against the task table wins; a whitespace-free
                // glob is a pattern; anything else is an inline command.
                if manifest.tasks.contains_key(text.as_str()) || is_pattern(text) {
                    patterns.push(text.clone());
                    matched_any |= include(manifest, text, false, &mut entries)?;
                } else {
                    entries.push(Entry::Inline(text.clone()));
                }
            }
        }
    }

    if !patterns.is_empty() && !matched_any {
        return Err(ResolveError::PatternMatchedNothing(patterns.remove(0)));
    }
    Ok(entries)
}

/// Add task names matched by one include reference. Returns whether the
/// reference matched anything.
fn include(
    manifest: &Manifest,
    pattern: &str,
    explicit: bool,
    entries: &mut Vec<Entry>,
) -> ResolveResult<bool> {
    if manifest.tasks.contains_key(pattern) {
        push_reference(entries, pattern);
        return Ok(true);
    }

    if is_pattern(pattern) {
        let matcher = compile(pattern)?;
        let mut matched = false;
        for name in manifest.names() {
            if matcher.is_match(name) {
                push_reference(entries, name);
                matched = true;
            }
        }
        return Ok(matched);
    }

    // A literal reference into a closed name set must resolve.
    if explicit {
        return Err(ResolveError::UnknownTask(pattern.to_string()));
    }
    Ok(false)
}

/// Remove previously accumulated references matching an exclude token.
fn exclude(pattern: &str, entries: &mut Vec<Entry>) -> ResolveResult<()> {
    if is_pattern(pattern) {
        let matcher = compile(pattern)?;
        entries.retain(|entry| match entry {
            Entry::Reference(name) => !matcher.is_match(name),
            Entry::Inline(_) => true,
        });
    } else {
        entries.retain(|entry| match entry {
            Entry::Reference(name) => name != pattern,
            Entry::Inline(_) => true,
        });
    }
    Ok(())
}

fn push_reference(entries: &mut Vec<Entry>, name: &str) {
    let already = entries.iter().any(|entry| match entry {
        Entry::Reference(existing) => existing == name,
        Entry::Inline(_) => false,
    });
    if !already {
        entries.push(Entry::Reference(name.to_string()));
    }
}

fn is_pattern(text: &str) -> bool {
    !text.chars().any(char::is_whitespace) && text.contains(['*', '?', '['])
}

fn compile(pattern: &str) -> ResolveResult<GlobMatcher> {
    Ok(Glob::new(pattern)
        .map_err(|e| ResolveError::BadPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?
        .compile_matcher())
}
