use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::ApiError;

/// Whether a content-type announces a JSON document
pub fn is_json_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("application/json") || ct.contains("+json")
}

/// Parse a response body the way every screen expects it: JSON documents
/// become JSON values, anything else becomes a string. A body that cannot be
/// read or parsed is `Value::Null`.
pub fn parse_body(content_type: &str, bytes: Option<&[u8]>) -> Value {
    let Some(bytes) = bytes else {
        return Value::Null;
    };

    if is_json_content_type(content_type) {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    } else {
        Value::String(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Resolve the message of a failed response.
///
/// Order: non-blank text body, `detail`, `message`, the JSON body itself,
/// then the status line.
pub fn resolve_message(body: &Value, status: StatusCode) -> String {
    match body {
        Value::Null => status_line(status),
        Value::String(text) if !text.trim().is_empty() => text.clone(),
        Value::String(_) => status_line(status),
        Value::Object(map) => {
            if let Some(detail) = map.get("detail").filter(|v| is_truthy(v)) {
                return stringify(detail);
            }
            if let Some(message) = map.get("message").filter(|v| is_truthy(v)) {
                return stringify(message);
            }
            body.to_string()
        }
        Value::Array(_) => body.to_string(),
        Value::Bool(_) | Value::Number(_) => body.to_string(),
    }
}

/// Turn a received response into either its parsed body or an `ApiError`
pub fn classify(status: StatusCode, headers: &HeaderMap, bytes: Option<&[u8]>) -> Result<Value, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let body = parse_body(content_type, bytes);

    if status.is_success() {
        return Ok(body);
    }

    let message = resolve_message(&body, status);
    tracing::warn!(status = status.as_u16(), %message, "request failed");

    Err(ApiError::Http {
        message,
        status: status.as_u16(),
        body,
        headers: header_list(headers),
    })
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn header_list(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
