//! Cloud completion backend.
//!
//! Deliberately a stub: without an API key every call reports
//! `CLOUD_DISABLED`, and with one it acknowledges at moderate confidence
//! without producing text. The routing, scrubbing, and audit paths around
//! it are real; wiring an actual provider in changes only this file.

use super::{ModelBackend, PredictOptions, Prediction};
use crate::config::Config;
use async_trait::async_trait;

/// Confidence reported when a key is configured.
const CLOUD_STUB_CONFIDENCE: f32 = 0.6;

/// The cloud model backend.
pub struct CloudBackend {
    api_key: Option<String>,
}

impl CloudBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
        }
    }

    /// Whether a key is configured and calls could go out.
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ModelBackend for CloudBackend {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn predict(&self, _prompt: &str, _opts: &PredictOptions) -> Prediction {
        if self.api_key.is_none() {
            return Prediction::failure("CLOUD_DISABLED");
        }
        Prediction {
            text: String::new(),
            confidence: CLOUD_STUB_CONFIDENCE,
            error: None,
        }
    }
}
