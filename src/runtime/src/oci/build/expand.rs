//! Variable substitution for instruction arguments.
//!
//! Supports `$NAME`, `${NAME}`, `${NAME:+word}` and `${NAME:-word}`. There is
//! no recursion: `word` is inserted literally, and nested references are not
//! resolved. A `$` preceded by a backslash is left untouched.

use std::collections::HashMap;
use std::sync::OnceLock;

use orca_core::error::{BuildError, Result};
use regex::{Captures, Regex};

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(\\)?\$(?:([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)(:([^}]?)([^}]*))?\})",
        )
        .expect("valid variable regex")
    })
}

/// Substitute every variable reference in `text` from `env`.
pub fn expand(text: &str, env: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in variable_re().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            out.push_str(whole.as_str());
            continue;
        }

        out.push_str(&substitute(&caps, env)?);
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand every argument, in order.
pub fn expand_all(args: &[String], env: &HashMap<String, String>) -> Result<Vec<String>> {
    args.iter().map(|arg| expand(arg, env)).collect()
}

fn substitute(caps: &Captures<'_>, env: &HashMap<String, String>) -> Result<String> {
    let name = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let value = env.get(name);

    if caps.get(4).is_none() {
        return Ok(value.cloned().unwrap_or_default());
    }

    let modifier = caps.get(5).map(|m| m.as_str()).unwrap_or_default();
    let word = caps.get(6).map(|m| m.as_str()).unwrap_or_default();
    let reference = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

    if modifier != "+" && modifier != "-" {
        return Err(BuildError::FormatError(format!(
            "invalid variable modifier in {}: expected ':+' or ':-'",
            reference
        )));
    }
    if word.is_empty() {
        return Err(BuildError::FormatError(format!(
            "empty modifier word in {}",
            reference
        )));
    }

    Ok(match (modifier, value) {
        ("+", Some(_)) => word.to_string(),
        ("+", None) => String::new(),
        (_, Some(v)) => v.clone(),
        (_, None) => word.to_string(),
    })
}
