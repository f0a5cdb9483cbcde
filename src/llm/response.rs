//! Helpers for shaping model output before parsing

use serde::de::DeserializeOwned;

use crate::error::{Result, ThursdayError};

/// Strip surrounding Markdown code fences (```` ``` ```` or ```` ```json ````)
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse model output as JSON after stripping code fences
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| ThursdayError::Execution(format!("could not parse model response ({}): {}", e, raw)))
}
