//! Structured-or-opaque decoding of record payloads.
//!
//! Collaborators often hand the recorder payloads that are already serialized, such as a
//! tool result that is a JSON-encoded object. Before an event is persisted, every string
//! that looks like a JSON object or array is parsed and replaced by the parsed value, so
//! the trace holds nested structures instead of escaped strings.

use serde_json::{Map, Value};

/// Recursively replace JSON-looking strings with their parsed form.
///
/// Strings that fail to parse are kept verbatim. Numbers, booleans and null pass through.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::String(text) => decode_string(text),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Whether the trimmed text is bracketed like a JSON object or array
pub fn looks_structured(text: &str) -> bool {
    let trimmed = text.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

fn decode_string(text: String) -> Value {
    if !looks_structured(&text) {
        return Value::String(text);
    }

    match serde_json::from_str::<Value>(text.trim()) {
        // Parsed containers can themselves hold serialized strings
        Ok(parsed) => normalize(parsed),
        Err(_) => Value::String(text),
    }
}
