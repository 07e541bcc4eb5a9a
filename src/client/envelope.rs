use serde::Deserialize;
use serde_json::Value;

/// Standard `{ data, message }` response wrapper used by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Pull a human-readable message out of an error body.
///
/// Handles `{ "message": "..." }`, validation-style `{ "message": ["a", "b"] }`,
/// and `{ "error": "..." }`; anything else is returned trimmed as-is.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };
    let from_field = |field: &str| match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    };
    from_field("message")
        .or_else(|| from_field("error"))
        .unwrap_or_else(|| trimmed.to_string())
}
