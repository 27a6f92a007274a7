//! Plan execution
//!
//! Runs resolved plans step by step: one child process at a time, stdio
//! inherited, environment layered process < task < command-line overrides.
//! Also owns workspace fan-out, which repeats the requested invocations in
//! each selected member directory.

use crate::config::{find_manifest_here, parse_manifest, Manifest, OsFiles};
use crate::error::{ResolveError, Result};
use crate::runner::context::{Context, Invocation};
use crate::runner::resolve::{resolve, Plan, PlanStep, StepCommand};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Aggregate result of running a plan or a sequence of invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// Exit code: 0, the first hard failure, or the last tolerated failure
    pub code: i32,

    /// A hard failure stopped execution before the end
    pub aborted: bool,

    /// A child was terminated by a signal
    pub interrupted: bool,
}

impl RunOutcome {
    fn success() -> Self {
        RunOutcome::default()
    }
}

/// The shell used for `Shell` steps and its command-string flag.
pub fn shell_invocation() -> (String, &'static str) {
    if cfg!(windows) {
        (
            env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string()),
            "/c",
        )
    } else {
        (
            env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
            "-c",
        )
    }
}

/// Run a plan and aggregate its exit status.
///
/// A non-zero step aborts the plan and becomes the exit code unless the
/// step's task was marked keep-going, in which case execution continues and
/// the final code is the last non-zero observed. Shell steps of tasks that
/// are not keep-going run under errexit, so a failure inside a multi-command
/// fragment also surfaces. A child killed by a signal aborts the plan with
/// `128 + signal`.
pub fn run_plan(plan: &Plan, ctx: &Context) -> Result<RunOutcome> {
    if ctx.dry_run {
        print_plan(plan, ctx);
        return Ok(RunOutcome::success());
    }

    let mut last_failure = 0;
    for step in &plan.steps {
        ctx.print_run(&format!("{}: {}", step.task, step.command.display()));

        let status = spawn_step(step, ctx)?;

        if let Some(signal) = signal_of(&status) {
            ctx.print_error(&format!("{}: terminated by signal {}", step.task, signal));
            return Ok(RunOutcome {
                code: 128 + signal,
                aborted: true,
                interrupted: true,
            });
        }

        let code = status.code().unwrap_or(1);
        if code != 0 {
            if step.keep_going {
                ctx.print_info(&format!("{}: exit {} (continuing)", step.task, code));
                last_failure = code;
            } else {
                return Ok(RunOutcome {
                    code,
                    aborted: true,
                    interrupted: false,
                });
            }
        }
    }

    Ok(RunOutcome {
        code: last_failure,
        aborted: false,
        interrupted: false,
    })
}

/// Resolve and run every requested invocation against one manifest.
pub fn run_invocations(
    manifest: &Manifest,
    invocations: &[Invocation],
    ctx: &Context,
) -> Result<RunOutcome> {
    let mut last_failure = 0;
    for invocation in invocations {
        let plan = resolve(manifest, &invocation.name, &invocation.args)?;
        ctx.print_debug(&format!(
            "resolved '{}' into {} step(s)",
            invocation.name,
            plan.steps.len()
        ));
        let outcome = run_plan(&plan, ctx)?;

        if outcome.interrupted {
            return Ok(outcome);
        }
        if outcome.code != 0 {
            if invocation.keep_going {
                ctx.print_info(&format!(
                    "{}: exit {} (continuing)",
                    invocation.name, outcome.code
                ));
                last_failure = outcome.code;
            } else {
                return Ok(RunOutcome {
                    code: outcome.code,
                    aborted: true,
                    interrupted: false,
                });
            }
        }
    }

    Ok(RunOutcome {
        code: last_failure,
        aborted: false,
        interrupted: false,
    })
}

/// Repeat the requested invocations in each selected workspace member.
///
/// Each member carries its own manifest, loaded from the member directory
/// itself. A hard failure in a member stops the fan-out; tolerated failures
/// carry into the final exit code.
pub fn run_in_members(
    manifest: &Manifest,
    invocations: &[Invocation],
    ctx: &Context,
) -> Result<RunOutcome> {
    let members = select_members(manifest, &ctx.workspace)?;
    if members.is_empty() {
        let pattern = ctx.workspace.first().cloned().unwrap_or_default();
        return Err(ResolveError::PatternMatchedNothing(pattern).into());
    }

    // Members never fan out recursively.
    let member_ctx = Context {
        workspace: Vec::new(),
        ..ctx.clone()
    };

    let mut last_failure = 0;
    for dir in members {
        ctx.print_info(&format!("workspace {}", dir.display()));

        let found = find_manifest_here(&dir, &OsFiles)?;
        let member_manifest = parse_manifest(&found.path, found.dialect, &found.contents)?;

        let outcome = run_invocations(&member_manifest, invocations, &member_ctx)?;
        if outcome.interrupted || outcome.aborted {
            return Ok(outcome);
        }
        if outcome.code != 0 {
            last_failure = outcome.code;
        }
    }

    Ok(RunOutcome {
        code: last_failure,
        aborted: false,
        interrupted: false,
    })
}

/// Expand the manifest's member globs into existing directories.
pub fn expand_members(manifest: &Manifest) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for pattern in &manifest.members {
        if pattern.contains(['*', '?', '[']) {
            let matcher = compile_member(pattern)?;
            let mut matches: Vec<PathBuf> = Vec::new();
            let mut all = Vec::new();
            walk_dirs(&manifest.root, &mut all);
            for dir in all {
                let Ok(rel) = dir.strip_prefix(&manifest.root) else {
                    continue;
                };
                if matcher.is_match(rel) {
                    matches.push(dir);
                }
            }
            matches.sort();
            for dir in matches {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        } else {
            let dir = manifest.root.join(pattern);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }

    Ok(dirs)
}

/// Filter expanded members by `--workspace` patterns; `*` selects all.
pub fn select_members(manifest: &Manifest, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let expanded = expand_members(manifest)?;
    if patterns.iter().any(|p| p == "*") {
        return Ok(expanded);
    }

    let mut matchers = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        matchers.push(compile_member(pattern)?);
    }

    let selected = expanded
        .into_iter()
        .filter(|dir| {
            let rel = dir.strip_prefix(&manifest.root).unwrap_or(dir);
            let name = dir.file_name().map(Path::new).unwrap_or(rel);
            matchers
                .iter()
                .any(|m| m.is_match(rel) || m.is_match(name))
        })
        .collect();
    Ok(selected)
}

fn compile_member(pattern: &str) -> Result<GlobMatcher> {
    Ok(Glob::new(pattern)
        .map_err(|e| ResolveError::BadPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?
        .compile_matcher())
}

fn walk_dirs(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if hidden {
            continue;
        }
        out.push(path.clone());
        walk_dirs(&path, out);
    }
}

fn spawn_step(step: &PlanStep, ctx: &Context) -> io::Result<ExitStatus> {
    let mut command = match &step.command {
        StepCommand::Shell(text) => {
            let (shell, flag) = shell_invocation();
            let mut command = Command::new(shell);
            // Without keep-going, a failing command aborts the whole
            // fragment (errexit), so the failure is observable.
            if !step.keep_going && !cfg!(windows) {
                command.arg("-e");
            }
            command.arg(flag).arg(text);
            command
        }
        StepCommand::Exec(argv) => {
            let mut command = Command::new(&argv[0]);
            command.args(&argv[1..]);
            command
        }
    };

    command.current_dir(&step.cwd);
    command.envs(&step.env);
    command.envs(&ctx.env);

    // The runner is transparent to the child.
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    command.status()
}

fn print_plan(plan: &Plan, ctx: &Context) {
    for step in &plan.steps {
        println!("[DRY-RUN] {} (cwd: {})", step.task, step.cwd.display());

        let mut env: BTreeMap<&str, &str> = BTreeMap::new();
        for (key, value) in &step.env {
            env.insert(key, value);
        }
        for (key, value) in &ctx.env {
            env.insert(key, value);
        }
        for (key, value) in env {
            println!("  env {}={}", key, value);
        }

        println!("  $ {}", step.command.display());
    }
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}
