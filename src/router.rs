//! Local-first backend routing.
//!
//! Decides, per request, whether the local Ollama backend or the cloud
//! backend will serve a prompt. The ladder is pure and first-match-wins;
//! the reason string is audit provenance, never consulted by later code.
//! Privacy-sensitive and system-action text never routes to cloud.

use crate::backends::{BackendSet, ModelBackend};
use crate::config::Config;
use crate::util::estimate_token_count;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

// ── Content checks ───────────────────────────────────────────────

/// PII shapes that pin a request to the local backend.
struct PrivacyPatterns {
    ssn_like: Regex,
    card_like: Regex,
    password_word: Regex,
}

static PRIVACY: LazyLock<PrivacyPatterns> = LazyLock::new(|| PrivacyPatterns {
    ssn_like: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
    card_like: Regex::new(r"\b\d{16}\b").unwrap(),
    password_word: Regex::new(r"(?i)\bpassword\b").unwrap(),
});

/// Verbs indicating the text manipulates this machine.
static SYSTEM_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(open|launch|start|systemctl|service|run|execute)\b").unwrap());

/// Whether text contains PII-shaped content.
pub fn is_privacy_sensitive(text: &str) -> bool {
    let p = &*PRIVACY;
    p.ssn_like.is_match(text) || p.card_like.is_match(text) || p.password_word.is_match(text)
}

/// Whether text looks like a local system action.
pub fn is_system_action(text: &str) -> bool {
    SYSTEM_ACTION.is_match(text)
}

// ── Routing decision ─────────────────────────────────────────────

/// Which backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Cloud,
}

impl BackendKind {
    /// Stable label used in audit records and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Cloud => "cloud",
        }
    }
}

/// The selected backend plus the provenance of the choice.
#[derive(Clone)]
pub struct RoutedBackend {
    /// Which backend was picked.
    pub name: BackendKind,
    /// The adapter to call.
    pub adapter: Arc<dyn ModelBackend>,
    /// Human-readable reason, recorded in the audit trail.
    pub reason: String,
}

impl RoutedBackend {
    /// Whether the request stays on this machine.
    pub fn is_local(&self) -> bool {
        self.name == BackendKind::Local
    }
}

/// Route one request. First match wins:
///
/// 1. caller or config forces cloud
/// 2. privacy-sensitive or system-action text stays local
/// 3. long text goes to cloud, if cloud uploads are allowed
/// 4. local by default
pub fn route_request(
    text: &str,
    force_cloud: bool,
    config: &Config,
    backends: &BackendSet,
) -> RoutedBackend {
    if force_cloud || config.force_cloud {
        return RoutedBackend {
            name: BackendKind::Cloud,
            adapter: Arc::clone(&backends.cloud),
            reason: "user override: force cloud".to_string(),
        };
    }

    if is_privacy_sensitive(text) || is_system_action(text) {
        return RoutedBackend {
            name: BackendKind::Local,
            adapter: Arc::clone(&backends.local),
            reason: "privacy/system-action -> local".to_string(),
        };
    }

    let complexity = estimate_token_count(text);
    if complexity > config.complexity_threshold_tokens && config.allow_cloud_uploads {
        return RoutedBackend {
            name: BackendKind::Cloud,
            adapter: Arc::clone(&backends.cloud),
            reason: format!(
                "complexity {complexity} > threshold {}",
                config.complexity_threshold_tokens
            ),
        };
    }

    RoutedBackend {
        name: BackendKind::Local,
        adapter: Arc::clone(&backends.local),
        reason: "default local policy".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 3110,
            complexity_threshold_tokens: 10,
            force_cloud: false,
            allow_cloud_uploads: true,
            enable_firejail: false,
            allow_sudo: false,
            audit_dir: std::path::PathBuf::from("/tmp/astra-test/audit"),
            audit_key_file: std::path::PathBuf::from("/tmp/astra-test/audit/key.bin"),
            ollama_url: "http://127.0.0.1:11434".into(),
            ollama_model: "mistral".into(),
            ollama_temperature: 0.2,
            ollama_top_p: 0.95,
            ollama_repeat_penalty: 1.1,
            local_system_prompt: "test".into(),
            http_timeout_secs: 2,
            openai_api_key: None,
            tts: "off".into(),
        }
    }

    fn make_backends(config: &Config) -> BackendSet {
        BackendSet::from_config(config)
    }

    #[test]
    fn force_cloud_beats_privacy() {
        let config = make_config();
        let backends = make_backends(&config);
        let routed = route_request("my password is hunter2", true, &config, &backends);
        assert_eq!(routed.name, BackendKind::Cloud);
        assert_eq!(routed.reason, "user override: force cloud");
    }

    #[test]
    fn config_force_cloud_applies() {
        let mut config = make_config();
        config.force_cloud = true;
        let backends = make_backends(&config);
        let routed = route_request("hello", false, &config, &backends);
        assert_eq!(routed.name, BackendKind::Cloud);
    }

    #[test]
    fn privacy_text_stays_local() {
        let config = make_config();
        let backends = make_backends(&config);
        for text in ["ssn 123-45-6789", "card 4111111111111111", "my PASSWORD"] {
            let routed = route_request(text, false, &config, &backends);
            assert_eq!(routed.name, BackendKind::Local, "{text}");
            assert_eq!(routed.reason, "privacy/system-action -> local");
        }
    }

    #[test]
    fn system_action_stays_local_even_when_long() {
        let config = make_config();
        let backends = make_backends(&config);
        let long_action = format!("run {}", "word ".repeat(100));
        let routed = route_request(&long_action, false, &config, &backends);
        assert_eq!(routed.name, BackendKind::Local);
        assert_eq!(routed.reason, "privacy/system-action -> local");
    }

    #[test]
    fn complex_text_goes_cloud_when_allowed() {
        let config = make_config();
        let backends = make_backends(&config);
        let long_text = "lorem ".repeat(100);
        let routed = route_request(&long_text, false, &config, &backends);
        assert_eq!(routed.name, BackendKind::Cloud);
        assert!(routed.reason.starts_with("complexity "));
        assert!(routed.reason.contains("threshold 10"));
    }

    #[test]
    fn complex_text_stays_local_when_uploads_disallowed() {
        let mut config = make_config();
        config.allow_cloud_uploads = false;
        let backends = make_backends(&config);
        let long_text = "lorem ".repeat(100);
        let routed = route_request(&long_text, false, &config, &backends);
        assert_eq!(routed.name, BackendKind::Local);
        assert_eq!(routed.reason, "default local policy");
    }

    #[test]
    fn short_neutral_text_defaults_local() {
        let config = make_config();
        let backends = make_backends(&config);
        let routed = route_request("what a nice day", false, &config, &backends);
        assert_eq!(routed.name, BackendKind::Local);
        assert_eq!(routed.reason, "default local policy");
        assert!(routed.is_local());
    }

    #[test]
    fn backend_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&BackendKind::Local).unwrap(), "\"local\"");
        assert_eq!(serde_json::to_string(&BackendKind::Cloud).unwrap(), "\"cloud\"");
    }

    #[test]
    fn adapter_matches_decision() {
        let config = make_config();
        let backends = make_backends(&config);
        let routed = route_request("hello there friend", false, &config, &backends);
        assert_eq!(routed.adapter.name(), "local");
    }
}
