//! Shared helpers for credential redaction.
//!
//! The API key travels as a query parameter, so any error message that echoes
//! a URL (reqwest errors do) can leak it. Every message that is logged or
//! returned to a caller goes through [`redact_secret`] first.

/// Marker substituted for the credential in redacted output.
pub(crate) const REDACTED: &str = "***";

/// Replace every occurrence of `secret` in `text` with the redaction marker.
///
/// An empty secret is a no-op: replacing the empty string would corrupt the
/// message rather than protect anything.
pub(crate) fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}

/// Truncate a message to `max` characters, respecting char boundaries.
pub(crate) fn truncate_message(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}
