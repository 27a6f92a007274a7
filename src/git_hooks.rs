//! Git hooks integration
//!
//! Tasks named `git-hook-<hook>` (where `<hook>` is a valid git hook name)
//! can be installed into the repository's `.git/hooks` directory as small
//! scripts that re-invoke drs with the hook task. `--sync-git-hooks`
//! replaces whatever is installed with exactly what the manifest declares.

use crate::config::Manifest;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Task-name prefix marking a git hook task.
pub const GIT_HOOK_PREFIX: &str = "git-hook-";

/// All valid git hook names.
pub const VALID_GIT_HOOKS: [&str; 13] = [
    "applypatch-msg",
    "commit-msg",
    "fsmonitor-watchman",
    "post-update",
    "pre-applypatch",
    "pre-commit",
    "pre-merge-commit",
    "pre-push",
    "pre-rebase",
    "pre-receive",
    "prepare-commit-msg",
    "push-to-checkout",
    "update",
];

/// The script installed for one hook.
///
/// Captures the current PATH so the hook finds the same drs binary the
/// user installed from, and re-invokes the prefixed task.
pub fn hook_template(hook: &str) -> String {
    let invocation = env::args()
        .next()
        .unwrap_or_else(|| "drs".to_string());
    let path = env::var("PATH").unwrap_or_default();
    format!(
        "#!/bin/sh\n\nPATH=\"{}\" {} {}{}\n",
        path, invocation, GIT_HOOK_PREFIX, hook
    )
}

/// Walk upward from `start` until a `.git` directory is found.
///
/// A `.git` *file* (a linked worktree) does not count; hooks live only in
/// a real repository directory.
pub fn find_git_directory(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

/// `(hook, script)` pairs for every `git-hook-<hook>` task with a valid
/// hook name, in declaration order.
///
/// Only builds the listing; nothing on disk is touched.
pub fn hook_scripts(manifest: &Manifest) -> Vec<(String, String)> {
    let mut hooks = Vec::new();
    for name in manifest.names() {
        let Some(hook) = name.strip_prefix(GIT_HOOK_PREFIX) else {
            continue;
        };
        if VALID_GIT_HOOKS.contains(&hook) {
            hooks.push((hook.to_string(), hook_template(hook)));
        }
    }
    hooks
}

/// Valid hook names currently installed under `<git_dir>/hooks`.
///
/// The directory is usually full of `<hook>.sample` files; only plain
/// files carrying a valid hook name count.
pub fn installed_hooks(git_dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(git_dir.join("hooks")) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if VALID_GIT_HOOKS.contains(&name) {
            found.push(name.to_string());
        }
    }
    found
}

/// Whether the installed hooks exactly match what the manifest declares.
///
/// Vacuously true when the manifest declares no hook tasks.
pub fn hooks_in_sync(git_dir: &Path, manifest: &Manifest) -> bool {
    let mut target = hook_scripts(manifest);
    if target.is_empty() {
        return true;
    }

    let mut installed = installed_hooks(git_dir);
    if installed.len() != target.len() {
        return false;
    }
    installed.sort();
    target.sort_by(|a, b| a.0.cmp(&b.0));

    for (installed_name, (name, script)) in installed.iter().zip(&target) {
        if installed_name != name {
            return false;
        }
        match fs::read_to_string(git_dir.join("hooks").join(name)) {
            Ok(contents) if contents == *script => {}
            _ => return false,
        }
    }
    true
}

/// Replace the installed hooks with the manifest's declarations.
///
/// Previously installed hooks are removed first, so hooks for tasks that
/// no longer exist do not linger.
pub fn install_hooks(git_dir: &Path, manifest: &Manifest) -> io::Result<usize> {
    let hook_dir = git_dir.join("hooks");
    fs::create_dir_all(&hook_dir)?;

    for hook in installed_hooks(git_dir) {
        fs::remove_file(hook_dir.join(hook))?;
    }

    let scripts = hook_scripts(manifest);
    for (hook, script) in &scripts {
        let path = hook_dir.join(hook);
        fs::write(&path, script)?;
        make_executable(&path)?;
    }
    Ok(scripts.len())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
