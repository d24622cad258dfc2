//! Request body capture
//!
//! Webhook senders post whatever they like. The body is stored as a JSON
//! value so history and live stream consumers see one shape:
//!
//! - empty payload: `null`
//! - payload that parses as JSON: the parsed value
//! - other UTF-8 payload: a JSON string
//! - anything else: `{"encoding": "base64", "data": "..."}`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

/// Decode a raw request body into the stored representation
pub fn decode_body(raw: &[u8]) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }

    if let Ok(value) = serde_json::from_slice::<Value>(raw) {
        return value;
    }

    match std::str::from_utf8(raw) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => json!({
            "encoding": "base64",
            "data": STANDARD.encode(raw),
        }),
    }
}
