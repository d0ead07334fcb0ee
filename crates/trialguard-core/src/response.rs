//! Recovering a JSON document from free-form model text.

use serde_json::Value;

use trialguard_contracts::error::{TrialGuardError, TrialGuardResult};

/// Locate and parse the JSON document in a model response.
///
/// Tried in order: a ```` ```json ```` fenced block, any fenced block, the
/// whole text, and finally the outermost `{...}` or `[...]` span.
pub fn extract_json(response: &str) -> TrialGuardResult<Value> {
    let text = response.trim();
    if text.is_empty() {
        return Err(TrialGuardError::UnparseableResponse {
            reason: "empty response".to_string(),
        });
    }

    if let Some(block) = fenced_block(text) {
        return serde_json::from_str(block).map_err(|e| TrialGuardError::UnparseableResponse {
            reason: format!("fenced block is not valid JSON: {e}"),
        });
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    outermost_span(text)
        .and_then(|span| serde_json::from_str(span).ok())
        .ok_or_else(|| TrialGuardError::UnparseableResponse {
            reason: "no JSON object or array found".to_string(),
        })
}

fn fenced_block(text: &str) -> Option<&str> {
    let (open, skip) = match text.find("```json") {
        Some(i) => (i, 7),
        None => (text.find("```")?, 3),
    };
    let start = open + skip;
    let end = text[start..].find("```")?;
    Some(text[start..start + end].trim())
}

fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(&['{', '['][..])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
