//! Model backends behind one prediction boundary.
//!
//! Backend failures are data, not faults: a failed call comes back as a
//! `Prediction` with empty text, zero confidence, and the error string
//! filled in. Nothing here panics, retries, or turns into a 500 upstream.

pub mod cloud;
pub mod local;

use crate::config::Config;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub use cloud::CloudBackend;
pub use local::LocalBackend;

/// Outcome of one backend call.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Generated text (empty on failure).
    pub text: String,
    /// Backend-reported confidence (0.0 on failure).
    pub confidence: f32,
    /// Failure cause when the call did not complete normally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Prediction {
    /// A failed call, carried as a value.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Per-request generation overrides. `None` fields fall back to the
/// backend's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub repeat_penalty: Option<f64>,
}

/// A model backend the router can pick.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short stable name used in routing decisions and audit records.
    fn name(&self) -> &'static str;

    /// One completion call. Never errors at the type level; see
    /// `Prediction::error`.
    async fn predict(&self, prompt: &str, opts: &PredictOptions) -> Prediction;
}

/// Both backends, constructed once at startup and cloned into state.
#[derive(Clone)]
pub struct BackendSet {
    pub local: Arc<dyn ModelBackend>,
    pub cloud: Arc<dyn ModelBackend>,
}

impl BackendSet {
    /// Build the local Ollama backend and the (possibly disabled) cloud
    /// backend from config.
    pub fn from_config(config: &Config) -> Self {
        let cloud = CloudBackend::new(config);
        if !cloud.is_enabled() {
            info!("cloud backend disabled: no API key configured");
        }
        Self {
            local: Arc::new(LocalBackend::new(config)),
            cloud: Arc::new(cloud),
        }
    }
}
