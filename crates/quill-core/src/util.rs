//! Shared utility functions used across multiple modules.

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

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize an OpenSSH public key line to `<type> <base64>`.
///
/// The trailing comment is dropped so keys compare equal regardless of the
/// label the user gave them. Returns `None` for blank input.
pub fn normalize_public_key(key: &str) -> Option<String> {
    let mut fields = key.split_whitespace();
    let kind = fields.next()?;
    match fields.next() {
        Some(blob) => Some(format!("{kind} {blob}")),
        None => Some(kind.to_string()),
    }
}
