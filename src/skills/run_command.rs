//! Plan builder for running a whitelisted command verbatim.
//!
//! The input is split with shell quoting rules, never handed to a
//! shell. Chaining metacharacters are rejected outright, quoted or
//! not, rather than passed through as inert arguments: a plan that
//! even looks like `ls; rm -rf /` should fail loudly at build time,
//! not rely on the gate's no-shell invocation to keep it harmless.
//! The metacharacter scan runs on the raw string before any quote
//! parsing, so `echo "a;b"` fails the same way.

use crate::error::PlanError;
use crate::policy::PolicyTables;
use crate::util::{shell_join, shell_split};

/// Upper bound on any single token. Bounds the argument-injection
/// surface from model-generated commands.
const MAX_ARG_LEN: usize = 256;

fn has_shell_control(raw: &str) -> bool {
    raw.contains("$(") || raw.chars().any(|c| matches!(c, ';' | '|' | '&' | '`' | '<' | '>'))
}

/// Build a one-command plan from a free-form command string, or
/// reject it.
pub fn build_run_command_plan(cmd: &str, policy: &PolicyTables) -> Result<Vec<String>, PlanError> {
    if has_shell_control(cmd) {
        return Err(PlanError::Validation(
            "Shell control characters not allowed".to_string(),
        ));
    }

    let parts = shell_split(cmd).map_err(|e| PlanError::Validation(e.to_string()))?;
    if parts.is_empty() {
        return Err(PlanError::Validation("Empty command".to_string()));
    }

    let binary = &parts[0];
    if !policy.allows_command(binary) {
        return Err(PlanError::Authorization(format!(
            "Command '{binary}' not allowed (whitelist)"
        )));
    }

    for part in &parts {
        if part.len() > MAX_ARG_LEN {
            return Err(PlanError::Validation("Argument too long".to_string()));
        }
    }

    Ok(vec![shell_join(&parts)])
}

// ── Tests ────────────────────────────────────────────────────────
