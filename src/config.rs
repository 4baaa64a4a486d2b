//! Runtime configuration, read once from the environment at startup.
//!
//! The resulting `Config` is immutable and shared behind `Arc`; nothing in
//! the process reads environment variables after construction. Invalid
//! numeric values fall back to their defaults with a warning rather than
//! aborting startup.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Default system prompt for local completions.
const DEFAULT_LOCAL_SYSTEM_PROMPT: &str =
    "You are Astra, a concise Linux desktop assistant. Answer briefly and factually.";

/// Fallback data dir when the platform dirs cannot be resolved.
const FALLBACK_DATA_DIR: &str = "/tmp/astra";

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway bind host.
    pub host: String,
    /// Gateway bind port.
    pub port: u16,
    /// Token-estimate threshold above which text counts as complex.
    pub complexity_threshold_tokens: usize,
    /// Route everything to cloud regardless of content checks.
    pub force_cloud: bool,
    /// Whether complex requests may be uploaded to the cloud backend.
    pub allow_cloud_uploads: bool,
    /// Wrap executed commands in a firejail private sandbox.
    pub enable_firejail: bool,
    /// Allow commands containing `sudo` (off unless explicitly enabled).
    pub allow_sudo: bool,
    /// Directory holding encrypted audit records.
    pub audit_dir: PathBuf,
    /// Path of the 32-byte audit encryption key.
    pub audit_key_file: PathBuf,
    /// Ollama base URL (joined with /api/chat).
    pub ollama_url: String,
    /// Ollama model name.
    pub ollama_model: String,
    /// Default generation temperature for local completions.
    pub ollama_temperature: f64,
    /// Default nucleus sampling value.
    pub ollama_top_p: f64,
    /// Default repeat penalty.
    pub ollama_repeat_penalty: f64,
    /// System prompt for local completions (override per request).
    pub local_system_prompt: String,
    /// Outbound HTTP timeout in seconds.
    pub http_timeout_secs: u64,
    /// Cloud API key; absent means the cloud backend stays disabled.
    pub openai_api_key: Option<String>,
    /// Spoken feedback: "auto" probes for espeak-ng, "off" disables.
    pub tts: String,
}

impl Config {
    /// Read the full configuration from `ASTRA_*` / `OLLAMA_*` variables.
    pub fn from_env() -> Arc<Self> {
        let audit_dir = std::env::var("ASTRA_AUDIT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir().join("audit"));
        let audit_key_file = std::env::var("ASTRA_AUDIT_KEY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| audit_dir.join("key.bin"));

        Arc::new(Self {
            host: env_string("ASTRA_HOST", "127.0.0.1"),
            port: env_parsed("ASTRA_PORT", 3110),
            complexity_threshold_tokens: env_parsed("ASTRA_COMPLEXITY_TOKENS", 800),
            force_cloud: env_bool("ASTRA_FORCE_CLOUD", false),
            allow_cloud_uploads: env_bool("ASTRA_ALLOW_CLOUD", false),
            enable_firejail: env_bool("ASTRA_ENABLE_FIREJAIL", false),
            allow_sudo: env_bool("ASTRA_ALLOW_SUDO", false),
            audit_dir,
            audit_key_file,
            ollama_url: env_string("OLLAMA_URL", "http://127.0.0.1:11434"),
            ollama_model: env_string("OLLAMA_MODEL", "mistral"),
            ollama_temperature: env_parsed("OLLAMA_TEMPERATURE", 0.2),
            ollama_top_p: env_parsed("OLLAMA_TOP_P", 0.95),
            ollama_repeat_penalty: env_parsed("OLLAMA_REPEAT_PENALTY", 1.1),
            local_system_prompt: env_string(
                "ASTRA_LOCAL_SYSTEM_PROMPT",
                DEFAULT_LOCAL_SYSTEM_PROMPT,
            ),
            http_timeout_secs: env_parsed("ASTRA_HTTP_TIMEOUT", 10),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            tts: env_string("ASTRA_TTS", "auto"),
        })
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "astra")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Accepts true/1/yes/on (case-insensitive) as true, everything else false.
fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_parsed<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, %default, "unparseable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
