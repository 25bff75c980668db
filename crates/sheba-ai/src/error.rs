//! Error types for sheba-ai

use thiserror::Error;

/// Result type alias using sheba-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a generation provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Build the error for a non-success HTTP status, given the response body.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| body.trim().to_string());
        match status {
            429 => Error::RateLimited { retry_after },
            401 | 403 => Error::Auth(message),
            _ => Error::api(status.to_string(), message),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Sse(_) => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.starts_with('5')
                    || et.contains("unavailable")
                    || et.contains("overloaded")
                    || msg.contains("rate limit")
                    || msg.contains("overloaded")
                    || msg.contains("too many requests")
                    || msg.contains("try again later")
            }
            _ => false,
        }
    }
}

/// Pull `error.message` out of a Google-style JSON error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_typed_variants() {
        assert!(Error::RateLimited { retry_after: Some(5) }.is_retryable());
        assert!(Error::Sse("connection reset".into()).is_retryable());
    }

    #[test]
    fn test_retryable_server_status() {
        let e = Error::api("503", "The model is overloaded. Please try again later.");
        assert!(e.is_retryable());
        assert!(Error::api("500", "Internal error").is_retryable());
    }

    #[test]
    fn test_retryable_api_rate_limit_message() {
        let e = Error::api("error", "Rate limit exceeded, please retry");
        assert!(e.is_retryable());
    }

    #[test]
    fn test_not_retryable_bad_request() {
        let e = Error::api("400", "Invalid JSON payload received");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_not_retryable_non_api() {
        assert!(!Error::InvalidApiKey.is_retryable());
        assert!(!Error::Auth("denied".into()).is_retryable());
    }

    #[test]
    fn test_from_status_maps_rate_limit_and_auth() {
        assert!(matches!(
            Error::from_status(429, "", Some(3)),
            Error::RateLimited { retry_after: Some(3) }
        ));
        match Error::from_status(403, r#"{"error":{"message":"API key not valid"}}"#, None) {
            Error::Auth(message) => assert_eq!(message, "API key not valid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_uses_raw_body_when_not_json() {
        match Error::from_status(502, "  bad gateway \n", None) {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "502");
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
