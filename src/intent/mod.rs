//! Intent resolution: free text to a structured, whitelisted action.
//!
//! Resolution is two-tier. The template tier matches an ordered list
//! of regular expressions and never leaves the process, covering the
//! common phrasings at zero latency. The model tier runs only when no
//! template fires: one low-temperature call to the local backend,
//! whose JSON reply is recovered via [`extract`] and validated before
//! it is trusted. An intent that survives neither tier is `None` and
//! the request is rejected upstream.

pub mod extract;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backends::{ModelBackend, PredictOptions};
use crate::policy::PolicyTables;

/// Confidence assigned to any template match.
const TEMPLATE_CONFIDENCE: f32 = 0.78;
/// Confidence for the loose "open X" heuristic.
const LOOSE_OPEN_CONFIDENCE: f32 = 0.6;
/// Confidence for a bare whitelisted app name ("firefox").
const BARE_APP_CONFIDENCE: f32 = 0.7;
/// Model-reported confidence below this is treated as a non-answer.
const LLM_MIN_CONFIDENCE: f32 = 0.45;
/// Sampling temperature for the extraction call. Near-greedy keeps
/// the JSON schema stable across runs.
const LLM_TEMPERATURE: f64 = 0.1;

/// System instruction pinning the extraction output schema.
const EXTRACTOR_SYSTEM_PROMPT: &str =
    "You are an intent extractor for a Linux desktop assistant. \
     Output only JSON with keys: intent, entities, confidence, reason. \
     allowed intents: open_app, run_command, manage_service, none. \
     entities can include: app, cmd, action, service. \
     Confidence is 0.0 to 1.0. No extra commentary.";

// ── Types ────────────────────────────────────────────────────────

/// The fixed set of actions this assistant knows how to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    OpenApp,
    ManageService,
    RunCommand,
}

impl IntentKind {
    /// Stable label used in audit records and model output.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::OpenApp => "open_app",
            IntentKind::ManageService => "manage_service",
            IntentKind::RunCommand => "run_command",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "open_app" => Some(IntentKind::OpenApp),
            "manage_service" => Some(IntentKind::ManageService),
            "run_command" => Some(IntentKind::RunCommand),
            _ => None,
        }
    }
}

/// Structured interpretation of one utterance.
#[derive(Debug, Clone, Serialize)]
pub struct Intent {
    pub name: IntentKind,
    /// Named parameters extracted from the text (app, cmd, action, service).
    pub entities: HashMap<String, String>,
    pub confidence: f32,
}

// ── Template tier ────────────────────────────────────────────────

struct IntentTemplate {
    kind: IntentKind,
    pattern: Regex,
}

/// Ordered intent templates. Declaration order is priority order and
/// is load-bearing: the first matching pattern wins, so open_app
/// claims "start firefox" before the service templates see it.
static TEMPLATES: LazyLock<Vec<IntentTemplate>> = LazyLock::new(|| {
    vec![
        IntentTemplate {
            kind: IntentKind::OpenApp,
            pattern: Regex::new(r"(?i)\b(open|launch|start)\s+(?P<app>[a-z0-9\-_. ]+)").unwrap(),
        },
        IntentTemplate {
            kind: IntentKind::ManageService,
            pattern: Regex::new(
                r"(?i)\bsystemctl\s+(?P<action>start|stop|restart|status)\s+(?P<service>[a-z0-9\-_.@]+)",
            )
            .unwrap(),
        },
        IntentTemplate {
            kind: IntentKind::ManageService,
            pattern: Regex::new(
                r"(?i)\bservice\s+(?P<action>start|stop|restart|status)\s+(?P<service>[a-z0-9\-_.@]+)",
            )
            .unwrap(),
        },
        IntentTemplate {
            kind: IntentKind::RunCommand,
            pattern: Regex::new(r"(?i)\b(run|execute)\s+(?P<cmd>.+)").unwrap(),
        },
        IntentTemplate {
            kind: IntentKind::RunCommand,
            pattern: Regex::new(r"(?i)^!(?P<cmd>.+)$").unwrap(),
        },
    ]
});

static LOOSE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bopen\s+(?P<app>[a-z0-9\-_. ]+)").unwrap());

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9\-_.]+").unwrap());

/// Deterministic tier: templates first, then two weaker heuristics.
/// Zero external calls.
pub fn parse_intent(text: &str, policy: &PolicyTables) -> Option<Intent> {
    let s = text.trim();
    for template in TEMPLATES.iter() {
        if let Some(caps) = template.pattern.captures(s) {
            let mut entities = HashMap::new();
            for name in template.pattern.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    if !m.as_str().is_empty() {
                        entities.insert(name.to_string(), m.as_str().to_string());
                    }
                }
            }
            return Some(Intent {
                name: template.kind,
                entities,
                confidence: TEMPLATE_CONFIDENCE,
            });
        }
    }

    // Loose "open X" catch with lower confidence.
    if let Some(caps) = LOOSE_OPEN.captures(s) {
        let mut entities = HashMap::new();
        entities.insert("app".to_string(), caps["app"].to_string());
        return Some(Intent {
            name: IntentKind::OpenApp,
            entities,
            confidence: LOOSE_OPEN_CONFIDENCE,
        });
    }

    // A single bare token that names a whitelisted app ("firefox").
    let lowered = s.to_lowercase();
    let tokens: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();
    if tokens.len() == 1 && policy.allows_app(tokens[0]) {
        let mut entities = HashMap::new();
        entities.insert("app".to_string(), tokens[0].to_string());
        return Some(Intent {
            name: IntentKind::OpenApp,
            entities,
            confidence: BARE_APP_CONFIDENCE,
        });
    }

    None
}

// ── Model tier ───────────────────────────────────────────────────

/// Ask the local backend to extract the intent as JSON. Returns
/// `None` on any transport failure, unrecoverable output, unknown
/// intent name, or sub-threshold confidence. Never consults the
/// cloud: utterances being classified may contain anything.
pub async fn llm_parse_intent(text: &str, backend: &dyn ModelBackend) -> Option<Intent> {
    let opts = PredictOptions {
        system_prompt: Some(EXTRACTOR_SYSTEM_PROMPT.to_string()),
        temperature: Some(LLM_TEMPERATURE),
        ..PredictOptions::default()
    };
    let prompt = format!("Text: {}", text.trim());

    let prediction = backend.predict(&prompt, &opts).await;
    let raw = prediction.text.trim();
    if raw.is_empty() {
        return None;
    }

    let obj = extract::recover_json_object(raw)?;
    let label = obj
        .get("intent")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let name = IntentKind::from_label(&label)?;

    let confidence = match obj.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(Value::String(s)) => s.trim().parse::<f32>().unwrap_or(0.0),
        _ => 0.0,
    };
    if confidence < LLM_MIN_CONFIDENCE {
        return None;
    }

    let mut entities = HashMap::new();
    if let Some(map) = obj.get("entities").and_then(Value::as_object) {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if !rendered.is_empty() {
                entities.insert(key.clone(), rendered);
            }
        }
    }

    Some(Intent {
        name,
        entities,
        confidence,
    })
}

/// Full resolution: template tier, then the model tier as fallback.
pub async fn resolve_intent(
    text: &str,
    policy: &PolicyTables,
    backend: &dyn ModelBackend,
) -> Option<Intent> {
    if let Some(intent) = parse_intent(text, policy) {
        return Some(intent);
    }
    llm_parse_intent(text, backend).await
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Prediction;
    use async_trait::async_trait;

    struct CannedBackend {
        reply: String,
    }

    #[async_trait]
    impl ModelBackend for CannedBackend {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn predict(&self, _prompt: &str, _opts: &PredictOptions) -> Prediction {
            Prediction {
                text: self.reply.clone(),
                confidence: 0.65,
                error: None,
            }
        }
    }

    #[test]
    fn template_matches_open_app() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("please open firefox", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
        assert_eq!(intent.entities["app"], "firefox");
        assert_eq!(intent.confidence, 0.78);
    }

    #[test]
    fn template_matches_systemctl_status() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("systemctl status sshd", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::ManageService);
        assert_eq!(intent.entities["action"], "status");
        assert_eq!(intent.entities["service"], "sshd");
    }

    #[test]
    fn template_matches_service_form() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("service restart cups", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::ManageService);
        assert_eq!(intent.entities["action"], "restart");
        assert_eq!(intent.entities["service"], "cups");
    }

    #[test]
    fn template_priority_is_declaration_order() {
        // "start" belongs to the open_app template, which is declared
        // before the service templates and therefore wins the tie.
        let policy = PolicyTables::builtin();
        let intent = parse_intent("systemctl start sshd", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
        assert_eq!(intent.entities["app"], "sshd");
    }

    #[test]
    fn template_matches_run_command() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("run ls -la /tmp", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::RunCommand);
        assert_eq!(intent.entities["cmd"], "ls -la /tmp");
    }

    #[test]
    fn template_matches_bang_prefix() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("!df -h", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::RunCommand);
        assert_eq!(intent.entities["cmd"], "df -h");
    }

    #[test]
    fn bare_whitelisted_app_name_resolves() {
        let policy = PolicyTables::builtin();
        let intent = parse_intent("Firefox!", &policy).unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
        assert_eq!(intent.entities["app"], "firefox");
        assert_eq!(intent.confidence, 0.7);
    }

    #[test]
    fn bare_unknown_word_does_not_resolve() {
        let policy = PolicyTables::builtin();
        assert!(parse_intent("grumble", &policy).is_none());
        assert!(parse_intent("what time is it", &policy).is_none());
    }

    #[tokio::test]
    async fn llm_accepts_valid_json() {
        let backend = CannedBackend {
            reply: r#"{"intent": "open_app", "entities": {"app": "firefox"}, "confidence": 0.9, "reason": "clear ask"}"#
                .to_string(),
        };
        let intent = llm_parse_intent("could you get my browser up", &backend)
            .await
            .unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
        assert_eq!(intent.entities["app"], "firefox");
        assert_eq!(intent.confidence, 0.9);
    }

    #[tokio::test]
    async fn llm_recovers_fenced_json() {
        let backend = CannedBackend {
            reply: "```json\n{\"intent\": \"run_command\", \"entities\": {\"cmd\": \"df -h\"}, \"confidence\": 0.8}\n```"
                .to_string(),
        };
        let intent = llm_parse_intent("how full are my disks", &backend)
            .await
            .unwrap();
        assert_eq!(intent.name, IntentKind::RunCommand);
        assert_eq!(intent.entities["cmd"], "df -h");
    }

    #[tokio::test]
    async fn llm_rejects_low_confidence() {
        let backend = CannedBackend {
            reply: r#"{"intent": "open_app", "entities": {}, "confidence": 0.2}"#.to_string(),
        };
        assert!(llm_parse_intent("hmm", &backend).await.is_none());
    }

    #[tokio::test]
    async fn llm_rejects_none_and_unknown_intents() {
        let none = CannedBackend {
            reply: r#"{"intent": "none", "entities": {}, "confidence": 0.99}"#.to_string(),
        };
        assert!(llm_parse_intent("hello there", &none).await.is_none());

        let unknown = CannedBackend {
            reply: r#"{"intent": "reboot_moon", "entities": {}, "confidence": 0.99}"#.to_string(),
        };
        assert!(llm_parse_intent("hello there", &unknown).await.is_none());
    }

    #[tokio::test]
    async fn llm_stringifies_scalar_entities_and_drops_empties() {
        let backend = CannedBackend {
            reply: r#"{"intent": "run_command", "entities": {"cmd": "free -m", "retries": 2, "note": "", "extra": null}, "confidence": 0.7}"#
                .to_string(),
        };
        let intent = llm_parse_intent("memory?", &backend).await.unwrap();
        assert_eq!(intent.entities["cmd"], "free -m");
        assert_eq!(intent.entities["retries"], "2");
        assert!(!intent.entities.contains_key("note"));
        assert!(!intent.entities.contains_key("extra"));
    }

    #[tokio::test]
    async fn resolve_prefers_template_tier() {
        // The canned model would answer run_command, but the template
        // tier fires first and the model is never consulted.
        let policy = PolicyTables::builtin();
        let backend = CannedBackend {
            reply: r#"{"intent": "run_command", "entities": {"cmd": "rm -rf /"}, "confidence": 0.99}"#
                .to_string(),
        };
        let intent = resolve_intent("open firefox", &policy, &backend)
            .await
            .unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
    }

    #[tokio::test]
    async fn resolve_falls_back_to_model_tier() {
        let policy = PolicyTables::builtin();
        let backend = CannedBackend {
            reply: r#"{"intent": "open_app", "entities": {"app": "nautilus"}, "confidence": 0.8}"#
                .to_string(),
        };
        let intent = resolve_intent("show me my files please", &policy, &backend)
            .await
            .unwrap();
        assert_eq!(intent.name, IntentKind::OpenApp);
        assert_eq!(intent.entities["app"], "nautilus");
    }
}
