use serde_json::Value;

use super::AiError;

const SNIPPET_LEN: usize = 200;

/// Strips Markdown code fences from model output
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let mut inner = trimmed;
    if let Some((_, after_first)) = inner.split_once('\n') {
        inner = after_first;
    }
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

/// Parses model output as JSON, tolerating fences and surrounding prose
pub fn parse_json_payload(text: &str) -> Result<Value, AiError> {
    let body = strip_fences(text);
    if body.is_empty() {
        return Err(AiError::EmptyResponse);
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(value);
    }

    // Best-effort: outermost object or array embedded in prose.
    let start = body.find(['{', '[']);
    let end = body.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AiError::MalformedJson(snippet(body)))
}

/// Pulls a readable message out of a provider error body
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| snippet(body))
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}
