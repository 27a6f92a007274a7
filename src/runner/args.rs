//! Shell-style positional argument interpolation
//!
//! Command templates may reference caller arguments with `$1`, `${2:-default}`,
//! `$@`, `$*`, and `$$`. Parsing is an explicit scanner so the braced default
//! form and the `$$` escape stay unambiguous.

use crate::error::{ResolveError, ResolveResult};
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

/// The outcome of interpolating one template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interpolation {
    /// Interpolated text
    pub text: String,

    /// 1-based positional indices consumed by the template
    pub used: BTreeSet<usize>,

    /// Whether `$@` or `$*` appeared
    pub splat: bool,
}

impl Interpolation {
    /// Whether the template took explicit control of the arguments.
    pub fn consumed_args(&self) -> bool {
        self.splat || !self.used.is_empty()
    }
}

/// Interpolate `template` against `args`.
///
/// Absent positionals become the empty string; `${N:-default}` substitutes
/// the default when the argument is absent or empty.
pub fn interpolate(template: &str, args: &[String]) -> ResolveResult<Interpolation> {
    let mut out = Interpolation::default();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.text.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.text.push('$');
            }
            Some('@') | Some('*') => {
                chars.next();
                out.text.push_str(&args.join(" "));
                out.splat = true;
            }
            Some(d) if d.is_ascii_digit() => {
                let index = scan_index(&mut chars, template)?;
                out.used.insert(index);
                if let Some(value) = args.get(index - 1) {
                    out.text.push_str(value);
                }
            }
            Some('{') => {
                chars.next();
                scan_braced(&mut chars, template, args, &mut out)?;
            }
            _ => {
                return Err(bad(
                    template,
                    "'$' must be followed by a digit, '{', '@', '*', or '$'",
                ));
            }
        }
    }

    Ok(out)
}

/// Interpolate a shell command template and forward unconsumed arguments.
///
/// If the template consumed nothing, the arguments are appended space-joined
/// with a single separating space. An empty template interpolates to the
/// joined arguments.
pub fn forward_shell(template: &str, args: &[String]) -> ResolveResult<String> {
    if template.is_empty() {
        return Ok(args.join(" "));
    }

    let interp = interpolate(template, args)?;
    if interp.consumed_args() || args.is_empty() {
        return Ok(interp.text);
    }
    Ok(format!("{} {}", interp.text, args.join(" ")))
}

/// Interpolate each argv element and forward unconsumed arguments as extra
/// elements.
pub fn forward_argv(argv: &[String], args: &[String]) -> ResolveResult<Vec<String>> {
    let mut out = Vec::with_capacity(argv.len());
    let mut consumed = false;

    for element in argv {
        let interp = interpolate(element, args)?;
        consumed = consumed || interp.consumed_args();
        out.push(interp.text);
    }

    if !consumed {
        out.extend(args.iter().cloned());
    }
    Ok(out)
}

fn scan_index(chars: &mut Peekable<Chars>, template: &str) -> ResolveResult<usize> {
    let mut digits = String::new();
    while let Some(d) = chars.peek() {
        if d.is_ascii_digit() {
            digits.push(*d);
            chars.next();
        } else {
            break;
        }
    }

    let index: usize = digits
        .parse()
        .map_err(|_| bad(template, format!("index '{}' is out of range", digits)))?;
    if index == 0 {
        return Err(bad(template, "positional indices start at $1"));
    }
    Ok(index)
}

fn scan_braced(
    chars: &mut Peekable<Chars>,
    template: &str,
    args: &[String],
    out: &mut Interpolation,
) -> ResolveResult<()> {
    let mut inner = String::new();
    loop {
        match chars.next() {
            Some('}') => break,
            Some(c) => inner.push(c),
            None => return Err(bad(template, "unterminated '${'")),
        }
    }

    let (index_part, default) = match inner.split_once(":-") {
        Some((index, default)) => (index, Some(default)),
        None => (inner.as_str(), None),
    };

    if index_part.is_empty() || !index_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad(
            template,
            format!("unsupported placeholder '${{{}}}'", inner),
        ));
    }
    let index: usize = index_part
        .parse()
        .map_err(|_| bad(template, format!("index '{}' is out of range", index_part)))?;
    if index == 0 {
        return Err(bad(template, "positional indices start at $1"));
    }

    out.used.insert(index);
    match args.get(index - 1) {
        Some(value) if !value.is_empty() => out.text.push_str(value),
        _ => {
            if let Some(default) = default {
                out.text.push_str(default);
            }
        }
    }
    Ok(())
}

fn bad(template: &str, detail: impl Into<String>) -> ResolveError {
    ResolveError::BadPlaceholder {
        template: template.to_string(),
        detail: detail.into(),
    }
}
