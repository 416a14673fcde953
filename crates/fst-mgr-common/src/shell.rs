//! Command templates and their execution through `/bin/sh`.
//!
//! Interface programming is delegated to external control utilities
//! (`hostapd_cli`, `wpa_cli`, vendor tools). Operators configure command
//! templates with `{name}` placeholders; every substituted value is
//! single-quoted, so interface names and addresses are always passed as
//! one literal word.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{FstMgrError, FstMgrResult};

pub const SH_CMD: &str = "/bin/sh";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("Invalid regex pattern"));

/// Single-quotes `word` for the shell.
///
/// Embedded single quotes are closed, escaped and reopened, so the result
/// is always one literal word.
///
/// ```
/// use fst_mgr_common::shell::quote;
///
/// assert_eq!(quote("wlan0"), "'wlan0'");
/// assert_eq!(quote("it's"), r"'it'\''s'");
/// ```
pub fn quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Renders a command template, replacing each `{name}` with the quoted
/// value bound to `name` in `vars`.
///
/// Fails with [`FstMgrError::Template`] on the first placeholder that has
/// no binding.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> FstMgrResult<String> {
    let mut unknown: Option<String> = None;

    let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| {
        match vars.iter().find(|(name, _)| *name == &caps[1]) {
            Some((_, value)) => quote(value),
            None => {
                unknown.get_or_insert_with(|| caps[0].to_string());
                String::new()
            }
        }
    });

    match unknown {
        Some(placeholder) => Err(FstMgrError::Template {
            template: template.to_string(),
            placeholder,
        }),
        None => Ok(rendered.into_owned()),
    }
}

/// Runs `command` through the shell and returns its trimmed stdout.
///
/// A non-zero exit or death by signal is reported as
/// [`FstMgrError::CommandFailed`] carrying the trimmed stderr.
pub async fn run(command: &str) -> FstMgrResult<String> {
    debug!(command, "Running");

    let output = Command::new(SH_CMD)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| FstMgrError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        warn!(command, status = ?output.status.code(), %stderr, "Command failed");
        return Err(FstMgrError::CommandFailed {
            command: command.to_string(),
            status: output.status.code(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
