//! Sensitive field masking for log records.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Replacement for any value stored under a sensitive key.
pub const REDACTION_MARKER: &str = "***REDACTED***";

/// Key fragments that mark a field as sensitive, compared case-insensitively
/// with `-` folded to `_`.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
];

/// Prefix written by [`Structured`] when its value cannot be serialized.
pub(crate) const UNENCODABLE_PREFIX: &str = "\u{0}unencodable:";

/// Whether values under `key` must be masked.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace('-', "_");
    SENSITIVE_KEYS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Mask sensitive keys in place, recursing through objects and arrays.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *inner = Value::String(REDACTION_MARKER.to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Log a serializable value as a nested field.
///
/// ```ignore
/// tracing::info!(payload = %Structured(&body), "received");
/// ```
///
/// The logging layer embeds the value as a JSON object/array (and masks it)
/// instead of a flat string.
pub struct Structured<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> fmt::Display for Structured<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self.0) {
            Ok(json) => f.write_str(&json),
            Err(e) => write!(f, "{}{}", UNENCODABLE_PREFIX, e),
        }
    }
}
