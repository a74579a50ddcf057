//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a timestamp the way the backend stores it (RFC 3339, millisecond precision).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Replace every string equal to `from` with `to`, recursively.
///
/// Returns the number of replacements made.
pub fn replace_string_values(value: &mut Value, from: &str, to: &str) -> usize {
    match value {
        Value::String(text) if text == from => {
            *text = to.to_string();
            1
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| replace_string_values(item, from, to))
            .sum(),
        Value::Object(map) => map
            .values_mut()
            .map(|item| replace_string_values(item, from, to))
            .sum(),
        _ => 0,
    }
}

/// Whether any string inside `value` equals `needle`.
pub fn contains_string_value(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(text) => text == needle,
        Value::Array(items) => items.iter().any(|item| contains_string_value(item, needle)),
        Value::Object(map) => map.values().any(|item| contains_string_value(item, needle)),
        _ => false,
    }
}

/// Every string inside `value` accepted by `matches`.
pub fn collect_string_values<'a>(
    value: &'a Value,
    matches: &dyn Fn(&str) -> bool,
    found: &mut Vec<&'a str>,
) {
    match value {
        Value::String(text) if matches(text) => found.push(text),
        Value::Array(items) => {
            for item in items {
                collect_string_values(item, matches, found);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_string_values(item, matches, found);
            }
        }
        _ => {}
    }
}
