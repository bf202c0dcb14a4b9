//! Error types for the studio and its generation providers.

use std::time::Duration;

/// Shown when a generation failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Maximum length of an API error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while preparing or running a generation.
#[derive(Debug, thiserror::Error)]
pub enum NovaError {
    /// User input failed validation (e.g. empty prompt).
    #[error("{0}")]
    Validation(String),

    /// A non-image file was selected.
    #[error("unsupported file type: {0}")]
    FileType(String),

    /// The selected file could not be read or encoded.
    #[error("failed to read image: {0}")]
    Encode(String),

    /// The generation collaborator failed with a free-form message.
    #[error("{0}")]
    Generation(String),

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Billing is not enabled for the API key.
    #[error("billing error: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered, but not with an image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NovaError {
    /// Returns the message to show the user for this error.
    ///
    /// Input errors map to fixed notification texts; free-form generation
    /// errors pass their message through untouched.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Validation(msg) | Self::Generation(msg) => msg.clone(),
            Self::FileType(_) => "Please select an image file.".to_string(),
            Self::Encode(_) => "Failed to read the image file.".to_string(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Result type alias for studio operations.
pub type Result<T> = std::result::Result<T, NovaError>;

/// Trims an API error body for display and redacts anything that looks like a key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            if looks_like_api_key(word) {
                "[REDACTED]".to_string()
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = redacted.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

fn looks_like_api_key(word: &str) -> bool {
    let word = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_');
    // Google API keys start with "AIza" and are 39 chars long.
    (word.starts_with("AIza") && word.len() >= 30) || word.starts_with("sk-")
}

/// Parses the `retry-after` header as whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_generation_message_through() {
        let err = NovaError::Generation("quota exceeded".into());
        assert_eq!(err.user_message(), "quota exceeded");
    }

    #[test]
    fn test_user_message_falls_back_when_empty() {
        let err = NovaError::Generation(String::new());
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);

        let err = NovaError::Generation("   ".into());
        assert_eq!(err.user_message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_user_message_for_input_errors() {
        assert_eq!(
            NovaError::Validation("Please enter a prompt.".into()).user_message(),
            "Please enter a prompt."
        );
        assert_eq!(
            NovaError::FileType("text/plain".into()).user_message(),
            "Please select an image file."
        );
        assert_eq!(
            NovaError::Encode("broken pipe".into()).user_message(),
            "Failed to read the image file."
        );
    }

    #[test]
    fn test_error_display() {
        let err = NovaError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");
        assert_eq!(err.user_message(), "API error: 404 - Not found");

        let err = NovaError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_error_message("invalid key AIzaSyA1234567890abcdefghijklmnopqrstu given");
        assert_eq!(msg, "invalid key [REDACTED] given");
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));

        headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), None);
    }
}
