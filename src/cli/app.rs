//! Main CLI application

use crate::config::{load_env_file, load_manifest_auto, load_manifest_path, Manifest};
use crate::error::{DrsError, Result};
use crate::git_hooks;
use crate::runner::{run_in_members, run_invocations, Context, Invocation, Verbosity};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Build the clap command.
fn build_command() -> Command {
    Command::new("drs")
        .version(crate::VERSION)
        .about("Run dev scripts from a project manifest")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .help("Manifest path (bypasses discovery)"),
        )
        .arg(
            Arg::new("cwd")
                .long("cwd")
                .value_name("PATH")
                .help("Change into this directory before discovery"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print the resolved plan without running anything")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("env")
                .short('e')
                .long("env")
                .value_name("KEY=VALUE")
                .help("Set an environment variable for every step")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("env-file")
                .long("env-file")
                .value_name("PATH")
                .help("Load KEY=VALUE pairs and apply them to every step"),
        )
        .arg(
            Arg::new("workspace")
                .short('w')
                .long("workspace")
                .value_name("GLOB")
                .help("Run tasks in matching workspace members ('*' for all)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Show debug messages")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sync-git-hooks")
                .long("sync-git-hooks")
                .help("Install git-hook-<name> tasks as git hooks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Task invocations: NAME [ARGS...] [:] ...")
                .num_args(0..)
                .allow_hyphen_values(true)
                .trailing_var_arg(true),
        )
}

/// Run the CLI application. Returns the process exit code.
pub fn run() -> Result<i32> {
    let matches = match build_command().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            // Help and version render on stdout and exit 0; everything else
            // is a usage error.
            let is_usage = e.use_stderr();
            let _ = e.print();
            return Ok(if is_usage { 1 } else { 0 });
        }
    };

    if let Some(dir) = matches.get_one::<String>("cwd") {
        env::set_current_dir(dir)?;
    }

    let manifest = load_manifest(&matches)?;

    if matches.get_flag("list") {
        print_list(&manifest);
        return Ok(0);
    }

    if matches.get_flag("sync-git-hooks") {
        return sync_git_hooks(&manifest, verbosity(&matches));
    }

    let tokens: Vec<String> = matches
        .get_many::<String>("tasks")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let invocations = parse_invocations(&tokens)?;
    if invocations.is_empty() {
        return Err(DrsError::Usage(
            "no task given (use --list to see available tasks)".to_string(),
        ));
    }

    let ctx = Context::new()
        .with_dry_run(matches.get_flag("dry-run"))
        .with_env(collect_env(&matches)?)
        .with_workspace(
            matches
                .get_many::<String>("workspace")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        )
        .with_verbosity(verbosity(&matches));

    let outcome = if ctx.workspace.is_empty() {
        run_invocations(&manifest, &invocations, &ctx)?
    } else {
        run_in_members(&manifest, &invocations, &ctx)?
    };

    Ok(outcome.code)
}

/// Install `git-hook-<name>` tasks into the enclosing repository's hooks.
fn sync_git_hooks(manifest: &Manifest, verbosity: Verbosity) -> Result<i32> {
    let ctx = Context::new().with_verbosity(verbosity);
    let git_dir = git_hooks::find_git_directory(&env::current_dir()?).ok_or_else(|| {
        DrsError::Usage("not inside a git repository (no .git directory found)".to_string())
    })?;

    if git_hooks::hooks_in_sync(&git_dir, manifest) {
        ctx.print_info("git hooks already in sync");
        return Ok(0);
    }

    let installed = git_hooks::install_hooks(&git_dir, manifest)?;
    ctx.print_info(&format!("installed {} git hook(s)", installed));
    Ok(0)
}

fn load_manifest(matches: &ArgMatches) -> Result<Manifest> {
    match matches.get_one::<String>("file") {
        Some(file) => {
            let path = PathBuf::from(file);
            let path = if path.is_absolute() {
                path
            } else {
                env::current_dir()?.join(path)
            };
            Ok(load_manifest_path(&path)?)
        }
        None => Ok(load_manifest_auto(&env::current_dir()?)?),
    }
}

fn verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("debug") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Merge `--env-file` values with `--env` pairs (`--env` wins).
fn collect_env(matches: &ArgMatches) -> Result<HashMap<String, String>> {
    let mut env = match matches.get_one::<String>("env-file") {
        Some(path) => load_env_file(PathBuf::from(path).as_path())?,
        None => HashMap::new(),
    };

    if let Some(pairs) = matches.get_many::<String>("env") {
        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(DrsError::Usage(format!(
                    "invalid --env '{}' (expected KEY=VALUE)",
                    pair
                )));
            };
            env.insert(key.to_string(), value.to_string());
        }
    }

    Ok(env)
}

/// Parse positional tokens into task invocations.
///
/// Tokens split on `:` (standalone, or suffixed to the task name); a `--`
/// token also closes the current invocation. A leading `+` marks the
/// invocation keep-going.
fn parse_invocations(tokens: &[String]) -> Result<Vec<Invocation>> {
    let mut invocations = Vec::new();
    let mut current: Option<Invocation> = None;

    for token in tokens {
        if token == ":" || token == "--" {
            if let Some(invocation) = current.take() {
                invocations.push(invocation);
            }
            continue;
        }

        match current.as_mut() {
            Some(invocation) => invocation.args.push(token.clone()),
            None => {
                let mut name = token.as_str();
                let mut keep_going = false;
                if let Some(rest) = name.strip_prefix('+') {
                    name = rest;
                    keep_going = true;
                }
                let name = name.strip_suffix(':').unwrap_or(name);
                if name.is_empty() {
                    return Err(DrsError::Usage(format!(
                        "invalid task invocation '{}'",
                        token
                    )));
                }

                let mut invocation = Invocation::new(name);
                invocation.keep_going = keep_going;
                current = Some(invocation);
            }
        }
    }

    if let Some(invocation) = current.take() {
        invocations.push(invocation);
    }
    Ok(invocations)
}

/// Print each task name and its help line, in declaration order.
fn print_list(manifest: &Manifest) {
    let width = manifest
        .names()
        .iter()
        .filter(|name| !name.starts_with('_'))
        .map(String::len)
        .max()
        .unwrap_or(0);

    for name in manifest.names() {
        let Some(task) = manifest.get(name) else {
            continue;
        };
        if task.is_hidden() {
            continue;
        }
        match &task.help {
            Some(help) => println!("{:<width$}  {}", name, help, width = width),
            None => println!("{}", name),
        }
    }
}
