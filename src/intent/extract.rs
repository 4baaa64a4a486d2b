//! Best-effort recovery of a JSON object from free-form model output.
//!
//! Small local models rarely emit clean JSON on the first try: the
//! object may arrive bare, wrapped in a markdown code fence, or buried
//! in surrounding prose. Each recovery step here is a pure function
//! returning an optional parsed object; [`recover_json_object`]
//! composes them left to right and stops at the first success.

use serde_json::Value;

// ── Recovery steps ───────────────────────────────────────────────

/// Parse the whole input as JSON. Only objects count; scalars and
/// arrays are rejected.
pub fn parse_direct(raw: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    value.is_object().then_some(value)
}

/// Extract and parse JSON from a markdown code fence. Prefers a
/// ```json fence, then falls back to a plain ``` fence (skipping a
/// language identifier line if present).
pub fn parse_fenced(raw: &str) -> Option<Value> {
    let candidate = fenced_body(raw)?;
    let value: Value = serde_json::from_str(candidate).ok()?;
    value.is_object().then_some(value)
}

/// Slice from the first `{` to the last `}` and parse the result.
/// Last resort for output like "Sure! Here is the JSON: {...}.".
pub fn parse_brace_slice(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    value.is_object().then_some(value)
}

/// Run the recovery chain: direct parse, then fenced block, then
/// brace slice. Returns the first object any step produces.
pub fn recover_json_object(raw: &str) -> Option<Value> {
    parse_direct(raw)
        .or_else(|| parse_fenced(raw))
        .or_else(|| parse_brace_slice(raw))
}

/// Locate the body of the first markdown code fence in `raw`.
fn fenced_body(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```json") {
        let body_start = start + "```json".len();
        if let Some(end) = raw[body_start..].find("```") {
            return Some(raw[body_start..body_start + end].trim());
        }
    }
    let start = raw.find("```")?;
    let body_start = start + 3;
    let end = raw[body_start..].find("```")?;
    let candidate = raw[body_start..body_start + end].trim();
    // Skip the language identifier line if present.
    if let Some(nl) = candidate.find('\n') {
        if !candidate[..nl].trim_start().starts_with('{') {
            return Some(candidate[nl + 1..].trim());
        }
    }
    Some(candidate)
}

// ── Tests ────────────────────────────────────────────────────────
