//! Log-safe views of payloads.
//!
//! The sanitized value is for logging only; what is sent is never modified.

use crate::payload::Payload;
use serde::Serialize;
use serde_json::{json, Value};

/// Longest body text kept in logs, in characters.
pub const MAX_LOGGED_BODY_CHARS: usize = 100;

/// Keys dropped entirely (compared case-insensitively).
const SENSITIVE_KEYS: &[&str] = &["auth", "password", "apikey", "api_key", "token", "secret"];

/// Keys whose text is truncated.
const BODY_KEYS: &[&str] = &["message", "textBody", "text", "body"];

/// Sanitized view of a payload.
pub fn sanitize_payload(payload: &Payload) -> Value {
    sanitize(payload)
}

/// Sanitized view of any serializable value.
pub fn sanitize<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(mut value) => {
            scrub(&mut value);
            value
        }
        Err(e) => json!({ "unserializable": e.to_string() }),
    }
}

fn scrub(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !is_sensitive(key));
            for (key, field) in map.iter_mut() {
                let replacement = match (key.as_str(), &*field) {
                    ("htmlBody", Value::String(_)) => Some("(html content)".to_string()),
                    ("content", Value::String(_)) => Some("(attachment content)".to_string()),
                    (key, Value::String(text)) if BODY_KEYS.contains(&key) => truncate(text),
                    _ => None,
                };
                match replacement {
                    Some(text) => *field = Value::String(text),
                    None => scrub(field),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(scrub),
        _ => {}
    }
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k))
}

fn truncate(text: &str) -> Option<String> {
    let mut chars = text.char_indices();
    let (cut, _) = chars.nth(MAX_LOGGED_BODY_CHARS)?;
    Some(format!("{}...", &text[..cut]))
}
