//! Whitelist policy tables: the sole authorization source of truth.
//!
//! Every app launch, service operation, and command execution is checked
//! against these tables before a plan exists. There is no mutation API;
//! the tables are built once at startup and shared behind `Arc`.

use std::collections::HashSet;
use std::sync::Arc;

// ── Built-in whitelists ──────────────────────────────────────────

/// Desktop applications the agent may launch.
const APPS: &[&str] = &["firefox", "code", "gnome-terminal", "nautilus"];

/// systemd verbs the agent understands. Only `status` survives the
/// permission check downstream; the rest are recognized so their
/// rejection can say "not permitted" instead of "not authorized".
const SERVICE_ACTIONS: &[&str] = &["start", "stop", "restart", "status"];

/// Services the agent may inspect.
const SERVICES: &[&str] = &["sshd", "bluetooth", "cups", "NetworkManager"];

/// First-token command whitelist for `run_command` plans.
const COMMANDS: &[&str] = &[
    "ls", "cp", "mv", "cat", "head", "tail", "echo", "pwd", "whoami", "uname", "df", "du", "free",
    "date", "flatpak",
];

/// Environment variables forwarded into child processes when present.
/// Everything else is stripped; PATH and locale are always set.
const ENV_PASSTHROUGH: &[&str] = &[
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_RUNTIME_DIR",
    "DBUS_SESSION_BUS_ADDRESS",
    "XAUTHORITY",
    "XDG_SESSION_TYPE",
    "XDG_CURRENT_DESKTOP",
    "DESKTOP_SESSION",
    "GDMSESSION",
    "KDE_FULL_SESSION",
    "QT_QPA_PLATFORM",
    "HOME",
    "SHELL",
];

// ── Policy tables ────────────────────────────────────────────────

/// Immutable whitelists consulted by plan builders and the execution gate.
pub struct PolicyTables {
    apps: HashSet<String>,
    service_actions: HashSet<String>,
    services: HashSet<String>,
    commands: HashSet<String>,
    env_passthrough: HashSet<String>,
}

impl PolicyTables {
    /// Build the built-in tables and wrap them for sharing.
    pub fn builtin() -> Arc<Self> {
        fn set(items: &[&str]) -> HashSet<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        }
        Arc::new(Self {
            apps: set(APPS),
            service_actions: set(SERVICE_ACTIONS),
            services: set(SERVICES),
            commands: set(COMMANDS),
            env_passthrough: set(ENV_PASSTHROUGH),
        })
    }

    /// Whether `app` may be launched.
    pub fn allows_app(&self, app: &str) -> bool {
        self.apps.contains(app)
    }

    /// Whether `command` may appear as the first token of a plan entry.
    pub fn allows_command(&self, command: &str) -> bool {
        self.commands.contains(command)
    }

    /// Whether `service` may be managed at all.
    pub fn allows_service(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    /// Whether `action` is a recognized service verb.
    pub fn allows_service_action(&self, action: &str) -> bool {
        self.service_actions.contains(action)
    }

    /// Iterate the passthrough variable names (for building child envs).
    pub fn env_passthrough_vars(&self) -> impl Iterator<Item = &str> {
        self.env_passthrough.iter().map(String::as_str)
    }
}
