//! Execution safety gate: the only place a plan touches a process.
//!
//! Commands are evaluated independently, in plan order, with no
//! abort-on-failure: every entry gets a result even when an earlier
//! one was rejected. Per command the gate checks, in order, the sudo
//! ban, the confirmation sentinel, dry-run, and the GUI session
//! precondition, then invokes the process directly (argv, no shell)
//! under a minimal constructed environment. The gate itself never
//! escalates privileges.

use std::process::Command;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::policy::PolicyTables;
use crate::util::{shell_join, shell_split};

/// PATH handed to children when the server itself has none.
const FALLBACK_PATH: &str = "/usr/bin:/bin";

/// First tokens that imply a GUI launch, beyond the app whitelist.
const GUI_LAUNCHERS: &[&str] = &["gtk-launch", "gio", "xdg-open"];

const SUDO_DISABLED: &str = "sudo not allowed without explicit feature enable";
const CONFIRMATION_REQUIRED: &str = "confirmation required";
const DRY_RUN_NOTICE: &str = "dry-run: not executed";
const NO_GUI_SESSION: &str = "No GUI session detected (DISPLAY/WAYLAND_DISPLAY not set). \
     Start the server from your desktop session or export these vars.";

/// Patterns whose match forces the confirmation sentinel. Matching is
/// case-sensitive: `DD` is not `dd`.
static RISKY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\brm\s+-rf\b",
        r"\bdd\b",
        r"\bmkfs\b",
        r"\bparted\b",
        r"\bsudo\b",
        r"\bchown\b\s+/.+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Whether a command string matches a risky pattern and therefore
/// needs `confirm: true` before the gate will run it.
pub fn requires_confirmation(cmd: &str) -> bool {
    RISKY.iter().any(|p| p.is_match(cmd))
}

// ── Result type ──────────────────────────────────────────────────

/// Outcome of one command in a plan.
///
/// `returncode` doubles as the rejection sentinel: 0 success, 1
/// rejected or failed to start, 2 confirmation required, negative
/// when the process died to a signal. Rejected entries carry the raw
/// command string; executed entries carry the requoted argv actually
/// invoked (including any sandbox prefix).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
}

impl ExecResult {
    fn rejected(raw: &str, stderr: &str, returncode: i32) -> Self {
        Self {
            command: raw.to_string(),
            stdout: String::new(),
            stderr: stderr.to_string(),
            returncode,
        }
    }
}

// ── Gate ─────────────────────────────────────────────────────────

/// Serializes a plan into subprocess invocations under the safety
/// rules above. Cheap to share; holds no mutable state.
pub struct ExecutionGate {
    config: Arc<Config>,
    policy: Arc<PolicyTables>,
}

impl ExecutionGate {
    pub fn new(config: Arc<Config>, policy: Arc<PolicyTables>) -> Self {
        Self { config, policy }
    }

    /// Evaluate every command in the plan, in order, synchronously.
    pub fn execute(&self, commands: &[String], confirm: bool, dry_run: bool) -> Vec<ExecResult> {
        commands
            .iter()
            .map(|raw| self.run_one(raw, confirm, dry_run))
            .collect()
    }

    fn run_one(&self, raw: &str, confirm: bool, dry_run: bool) -> ExecResult {
        // Substring on purpose: catches sudo buried mid-string too.
        if raw.contains("sudo") && !self.config.allow_sudo {
            warn!(command = raw, "rejected: privilege escalation disabled");
            return ExecResult::rejected(raw, SUDO_DISABLED, 1);
        }

        if requires_confirmation(raw) && !confirm {
            warn!(command = raw, "rejected: confirmation required");
            return ExecResult::rejected(raw, CONFIRMATION_REQUIRED, 2);
        }

        if dry_run {
            return ExecResult {
                command: raw.to_string(),
                stdout: DRY_RUN_NOTICE.to_string(),
                stderr: String::new(),
                returncode: 0,
            };
        }

        let parts = match shell_split(raw) {
            Ok(parts) => parts,
            Err(e) => return ExecResult::rejected(raw, &e.to_string(), 1),
        };
        let Some(first) = parts.first() else {
            return ExecResult::rejected(raw, "Empty command", 1);
        };

        if self.implies_gui(first) && !display_available() {
            warn!(command = raw, "rejected: no GUI session");
            return ExecResult::rejected(raw, NO_GUI_SESSION, 1);
        }

        self.run_subprocess(sandboxed(parts, self.config.enable_firejail))
    }

    fn implies_gui(&self, first_token: &str) -> bool {
        GUI_LAUNCHERS.contains(&first_token) || self.policy.allows_app(first_token)
    }

    fn run_subprocess(&self, argv: Vec<String>) -> ExecResult {
        let joined = shell_join(&argv);

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).env_clear();
        cmd.env(
            "PATH",
            std::env::var("PATH").unwrap_or_else(|_| FALLBACK_PATH.to_string()),
        );
        cmd.env("LC_ALL", "C.UTF-8").env("LANG", "C.UTF-8");
        for key in self.policy.env_passthrough_vars() {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }

        match cmd.output() {
            Ok(output) => {
                let returncode = exit_code(output.status);
                info!(command = %joined, code = returncode, "command finished");
                ExecResult {
                    command: joined,
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    returncode,
                }
            }
            Err(e) => {
                warn!(command = %joined, error = %e, "failed to start");
                ExecResult {
                    command: joined,
                    stdout: String::new(),
                    stderr: format!("failed to start: {e}"),
                    returncode: 1,
                }
            }
        }
    }
}

/// Prepend the firejail wrapper when sandboxing is enabled.
fn sandboxed(parts: Vec<String>, enable_firejail: bool) -> Vec<String> {
    if !enable_firejail {
        return parts;
    }
    let mut argv = vec![
        "firejail".to_string(),
        "--quiet".to_string(),
        "--private".to_string(),
    ];
    argv.extend(parts);
    argv
}

fn display_available() -> bool {
    std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

// ── Tests ────────────────────────────────────────────────────────
