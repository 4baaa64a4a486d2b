//! Local Ollama chat backend.
//!
//! Talks to `/api/chat` with streaming off. Known Ollama versions answer
//! with either a single `message` object or a `messages` array; both are
//! accepted and the last message content wins.

use super::{ModelBackend, PredictOptions, Prediction};
use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Confidence reported for completions that came back normally.
const LOCAL_SUCCESS_CONFIDENCE: f32 = 0.65;

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_p: f64,
    repeat_penalty: f64,
}

/// Ollama chat response; the field carrying the reply varies by version.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    messages: Option<Vec<OllamaResponseMessage>>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

/// The local model backend.
pub struct LocalBackend {
    url: String,
    model: String,
    system_prompt: String,
    temperature: f64,
    top_p: f64,
    repeat_penalty: f64,
    client: reqwest::Client,
}

impl LocalBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            url: format!("{}/api/chat", config.ollama_url.trim_end_matches('/')),
            model: config.ollama_model.clone(),
            system_prompt: config.local_system_prompt.clone(),
            temperature: config.ollama_temperature,
            top_p: config.ollama_top_p,
            repeat_penalty: config.ollama_repeat_penalty,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.http_timeout_secs))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl ModelBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn predict(&self, prompt: &str, opts: &PredictOptions) -> Prediction {
        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: opts
                        .system_prompt
                        .clone()
                        .unwrap_or_else(|| self.system_prompt.clone()),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: opts.temperature.unwrap_or(self.temperature),
                top_p: opts.top_p.unwrap_or(self.top_p),
                repeat_penalty: opts.repeat_penalty.unwrap_or(self.repeat_penalty),
            },
        };

        let resp = match self.client.post(&self.url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => return Prediction::failure(e.to_string()),
        };
        if !resp.status().is_success() {
            return Prediction::failure(format!("HTTP {}", resp.status().as_u16()));
        }
        let data: OllamaChatResponse = match resp.json().await {
            Ok(data) => data,
            Err(e) => return Prediction::failure(format!("malformed response: {e}")),
        };

        let text = data
            .message
            .map(|m| m.content)
            .or_else(|| {
                data.messages
                    .and_then(|ms| ms.into_iter().next_back().map(|m| m.content))
            })
            .unwrap_or_default();

        Prediction {
            text,
            confidence: LOCAL_SUCCESS_CONFIDENCE,
            error: None,
        }
    }
}
