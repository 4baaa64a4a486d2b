//! Plan builder for launching a whitelisted desktop application.
//!
//! App names arrive from speech transcripts, so sanitizing is the
//! first step: stray punctuation and doubled spaces are the norm, not
//! the exception. Launch resolution prefers a binary on `PATH`, then
//! `gtk-launch` with a known desktop id, then a flatpak invocation,
//! and finally the bare name as a last resort.

use crate::error::PlanError;
use crate::policy::PolicyTables;

/// Spoken-name aliases applied after sanitizing.
const APP_ALIASES: &[(&str, &str)] = &[("terminal", "gnome-terminal"), ("files", "nautilus")];

/// Desktop ids for `gtk-launch`.
const DESKTOP_IDS: &[(&str, &str)] = &[
    ("firefox", "org.mozilla.firefox"),
    ("gnome-terminal", "org.gnome.Terminal"),
    ("nautilus", "org.gnome.Nautilus"),
    ("code", "code"),
];

/// Flatpak application ids. Differs from the desktop table for
/// VS Code only.
const FLATPAK_IDS: &[(&str, &str)] = &[
    ("firefox", "org.mozilla.firefox"),
    ("gnome-terminal", "org.gnome.Terminal"),
    ("nautilus", "org.gnome.Nautilus"),
    ("code", "com.visualstudio.code"),
];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Normalize a spoken app name: case, enclosing punctuation, doubled
/// internal whitespace.
fn sanitize_app(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = lowered.trim_matches(|c: char| " .!?,;:'\"()[]{}".contains(c));
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the launch command for an authorized app given which launcher
/// mechanisms are actually present on this machine.
fn resolve_launch(app: &str, have_binary: bool, have_gtk_launch: bool, have_flatpak: bool) -> String {
    if have_binary {
        return app.to_string();
    }
    if have_gtk_launch {
        if let Some(id) = lookup(DESKTOP_IDS, app) {
            return format!("gtk-launch {id}");
        }
    }
    if have_flatpak {
        if let Some(id) = lookup(FLATPAK_IDS, app) {
            return format!("flatpak run {id}");
        }
    }
    // Last resort: hand the bare name to the gate anyway.
    app.to_string()
}

/// Build a one-command plan that opens `app_name`, or reject it.
pub fn build_open_app_plan(app_name: &str, policy: &PolicyTables) -> Result<Vec<String>, PlanError> {
    let sanitized = sanitize_app(app_name);
    let app = lookup(APP_ALIASES, &sanitized).unwrap_or(&sanitized);

    if !policy.allows_app(app) {
        return Err(PlanError::Authorization(format!(
            "App '{app}' not allowed (whitelist)"
        )));
    }

    let command = resolve_launch(
        app,
        which::which(app).is_ok(),
        which::which("gtk-launch").is_ok(),
        which::which("flatpak").is_ok(),
    );
    Ok(vec![command])
}

// ── Tests ────────────────────────────────────────────────────────
