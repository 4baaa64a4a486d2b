//! Axum HTTP gateway: the transport skin over the planning pipeline.
//!
//! ## Endpoints
//! - `GET /health` — liveness probe.
//! - `POST /v1/ingress/transcript` — the full pipeline: route the
//!   text, resolve an intent, build an authorized plan, run it
//!   through the safety gate, speak an acknowledgement.
//! - `POST /v1/execute` — operator surface: raw command strings
//!   straight into the gate, same safety rules, no intent step.
//! - `POST /v1/llm/complete` — routed completion; prompts leaving the
//!   machine pass the privacy scrubber first.
//!
//! Anything that can reach the gate is written to the encrypted audit
//! trail beforehand; if that write fails the request fails with it.
//! Body size and request time are bounded at the router layer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::backends::{BackendSet, PredictOptions};
use crate::config::Config;
use crate::exec::{ExecResult, ExecutionGate};
use crate::intent::resolve_intent;
use crate::policy::PolicyTables;
use crate::router::route_request;
use crate::security::scrub_text;
use crate::skills::plan_for_intent;
use crate::speech::SpeechSink;
use crate::util::truncate_with_ellipsis;

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout. Covers a local model call plus a short
/// subprocess while still stopping slow-loris abuse.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Spoken after a transcript plan has been through the gate.
const DONE_PHRASE: &str = "Done. Check your terminal output.";

// ── Shared state ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<PolicyTables>,
    pub backends: Arc<BackendSet>,
    pub gate: Arc<ExecutionGate>,
    pub audit: Arc<AuditLog>,
    pub speech: Arc<dyn SpeechSink>,
}

impl AppState {
    /// Write one audit record. Returns false when the trail is
    /// unwritable; callers sitting before the gate must then refuse
    /// the request rather than execute unrecorded.
    fn record(&self, record: Value) -> bool {
        match self.audit.write(&record) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "audit write failed");
                false
            }
        }
    }
}

// ── Request payloads ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct UserPrefs {
    #[serde(default)]
    force_cloud: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptRequest {
    transcript: String,
    #[serde(default)]
    context: Value,
    #[serde(default)]
    user_prefs: UserPrefs,
    #[serde(default = "default_true")]
    dry_run: bool,
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    commands: Vec<String>,
    #[serde(default = "default_true")]
    dry_run: bool,
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionOptions {
    temperature: Option<f64>,
    top_p: Option<f64>,
    repeat_penalty: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompletionRequest {
    prompt: String,
    #[serde(default)]
    user_prefs: UserPrefs,
    #[serde(default = "default_true")]
    scrub_privacy: bool,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    options: Option<CompletionOptions>,
}

// ── Server ───────────────────────────────────────────────────────

/// Bind and serve until shutdown.
pub async fn run_gateway(host: &str, port: u16, config: Arc<Config>) -> anyhow::Result<()> {
    if !is_loopback(host) {
        warn!(host, "binding beyond loopback; the gateway carries no authentication layer");
    }

    let policy = PolicyTables::builtin();
    let backends = Arc::new(BackendSet::from_config(&config));
    let audit = Arc::new(AuditLog::open(&config.audit_dir, &config.audit_key_file)?);
    let speech = crate::speech::sink_from_config(&config);
    let gate = Arc::new(ExecutionGate::new(Arc::clone(&config), Arc::clone(&policy)));

    let state = AppState {
        config,
        policy,
        backends,
        gate,
        audit,
        speech,
    };
    let app = build_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "astra gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "localhost" | "::1")
}

/// Assemble the route table and protective layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/v1/ingress/transcript", post(handle_transcript))
        .route("/v1/execute", post(handle_execute))
        .route("/v1/llm/complete", post(handle_llm_complete))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

/// Run the gate off the async runtime; it blocks on subprocesses.
async fn run_gate(
    state: &AppState,
    plan: Vec<String>,
    confirm: bool,
    dry_run: bool,
) -> Result<Vec<ExecResult>, (StatusCode, Json<Value>)> {
    let gate = Arc::clone(&state.gate);
    let handle = tokio::task::spawn_blocking(move || gate.execute(&plan, confirm, dry_run));
    match handle.await {
        Ok(results) => Ok(results),
        Err(e) => {
            error!(error = %e, "execution task failed");
            Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "execution task failed",
            ))
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────

/// GET /health
async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /v1/ingress/transcript
async fn handle_transcript(
    State(state): State<AppState>,
    Json(payload): Json<TranscriptRequest>,
) -> (StatusCode, Json<Value>) {
    let text = payload.transcript.trim().to_string();
    if text.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "transcript must not be empty");
    }

    let request_id = Uuid::new_v4().to_string();
    let routed = route_request(
        &text,
        payload.user_prefs.force_cloud,
        &state.config,
        &state.backends,
    );
    info!(
        request_id,
        model = routed.name.as_str(),
        reason = routed.reason,
        text = truncate_with_ellipsis(&text, 80),
        "transcript routed"
    );

    let resolved = resolve_intent(&text, &state.policy, state.backends.local.as_ref()).await;
    let Some(intent) = resolved else {
        state.record(json!({
            "event": "intent_failed",
            "request_id": request_id,
            "text": text,
            "error": "Could not parse intent",
        }));
        return reject(StatusCode::BAD_REQUEST, "Could not parse intent");
    };

    let plan = match plan_for_intent(&intent, &state.policy) {
        Ok(plan) => plan,
        Err(e) => {
            state.record(json!({
                "event": "plan_rejected",
                "request_id": request_id,
                "kind": e.kind(),
                "text": text,
                "error": e.to_string(),
            }));
            return reject(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let recorded = state.record(json!({
        "event": "route",
        "request_id": request_id,
        "model": routed.name,
        "reason": routed.reason,
        "text": text,
        "context": payload.context,
        "plan": plan.clone(),
        "dry_run": payload.dry_run,
    }));
    if !recorded {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "audit trail unavailable");
    }

    let results = match run_gate(&state, plan, payload.confirm, payload.dry_run).await {
        Ok(results) => results,
        Err(response) => return response,
    };

    state.speech.say(DONE_PHRASE);
    state.record(json!({
        "event": "execute_results",
        "request_id": request_id,
        "results": results.clone(),
    }));
    (StatusCode::OK, Json(json!(results)))
}

/// POST /v1/execute
async fn handle_execute(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> (StatusCode, Json<Value>) {
    let request_id = Uuid::new_v4().to_string();
    let recorded = state.record(json!({
        "event": "execute_request",
        "request_id": request_id,
        "commands": payload.commands.clone(),
        "dry_run": payload.dry_run,
    }));
    if !recorded {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "audit trail unavailable");
    }

    let results = match run_gate(&state, payload.commands, payload.confirm, payload.dry_run).await
    {
        Ok(results) => results,
        Err(response) => return response,
    };

    state.record(json!({
        "event": "execute_results",
        "request_id": request_id,
        "results": results.clone(),
    }));
    (StatusCode::OK, Json(json!(results)))
}

/// POST /v1/llm/complete
async fn handle_llm_complete(
    State(state): State<AppState>,
    Json(payload): Json<CompletionRequest>,
) -> (StatusCode, Json<Value>) {
    let routed = route_request(
        &payload.prompt,
        payload.user_prefs.force_cloud,
        &state.config,
        &state.backends,
    );

    // Scrub only what leaves the machine.
    let prompt = if !routed.is_local() && payload.scrub_privacy {
        scrub_text(&payload.prompt)
    } else {
        payload.prompt.clone()
    };

    let options = payload.options.unwrap_or_default();
    let opts = PredictOptions {
        system_prompt: payload.system_prompt,
        temperature: options.temperature,
        top_p: options.top_p,
        repeat_penalty: options.repeat_penalty,
    };
    let prediction = routed.adapter.predict(&prompt, &opts).await;

    state.record(json!({
        "event": "llm_complete",
        "model": routed.name,
        "reason": routed.reason,
        "confidence": prediction.confidence,
        "error": prediction.error,
    }));

    (
        StatusCode::OK,
        Json(json!({
            "model": routed.name,
            "reason": routed.reason,
            "text": prediction.text,
            "confidence": prediction.confidence,
            "error": prediction.error,
        })),
    )
}

// ── Tests ────────────────────────────────────────────────────────
