// src/workflow/resolve.rs

//! `$PROJECT_DIR$` / `$USER_HOME$` placeholder expansion.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{Result, SyncwatchError};
use crate::types::ProjectContext;
use crate::watch::path_utils::absolutize;

pub const PROJECT_DIR_TOKEN: &str = "$PROJECT_DIR$";
pub const USER_HOME_TOKEN: &str = "$USER_HOME$";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[^$\s]+\$").expect("placeholder regex is valid"));

/// Replace known placeholders. `$USER_HOME$` is left in place when the home
/// directory is unknown.
pub fn expand_placeholders(input: &str, ctx: &ProjectContext) -> String {
    let mut out = input.replace(PROJECT_DIR_TOKEN, &ctx.project_dir_str());
    if let Some(home) = ctx.user_home_str() {
        out = out.replace(USER_HOME_TOKEN, &home);
    }
    out
}

/// First `$NAME$` token still present in `value`, if any.
pub fn leftover_token(value: &str) -> Option<&str> {
    TOKEN_RE.find(value).map(|m| m.as_str())
}

/// Expand a mandatory value. Missing, empty or partially resolved values are
/// resolution errors naming `field`.
pub fn resolve_required(field: &str, value: Option<&str>, ctx: &ProjectContext) -> Result<String> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncwatchError::Resolution(format!("'{field}' is missing or empty")))?;

    let resolved = expand_placeholders(raw, ctx);
    if resolved.trim().is_empty() {
        return Err(SyncwatchError::Resolution(format!(
            "'{field}' resolved to an empty value"
        )));
    }
    if let Some(token) = leftover_token(&resolved) {
        return Err(SyncwatchError::Resolution(format!(
            "'{field}' still contains unresolved placeholder {token}"
        )));
    }
    Ok(resolved)
}

/// Expand placeholders and make the result an absolute, normalized path
/// (relative values are taken against the project directory).
pub fn resolve_path(value: &str, ctx: &ProjectContext) -> PathBuf {
    let expanded = expand_placeholders(value.trim(), ctx);
    absolutize(&ctx.project_dir, &PathBuf::from(expanded))
}
