//! Error types used throughout the client

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Categories of API errors, used by callers to pick a UI reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403) - session already invalidated on 401
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx) and unreadable success bodies
    Server,
    /// Client errors (4xx except auth and rate limiting)
    Client,
    /// Network/connection errors
    Network,
    /// Configuration and local storage errors
    Config,
}

/// The single error type surfaced by every client verb
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP response after normalization by the response handler.
    ///
    /// `Display` renders `message` verbatim so it can be shown to users.
    #[error("{message}")]
    Http {
        /// HTTP status code of the response
        status: u16,
        /// Human-readable message (server supplied or a fixed fallback)
        message: String,
        /// Delay derived from a `Retry-After` header, in milliseconds
        retry_after_ms: Option<u64>,
        /// Parsed JSON error body, when the server sent one
        body: Option<Value>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Build an HTTP error without auxiliary data.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into(), retry_after_ms: None, body: None }
    }

    /// HTTP status, when the error was derived from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message without any category prefix
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// `Retry-After` delay in milliseconds, if the server sent one
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Http { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// `Retry-After` delay as a [`Duration`]
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms().map(Duration::from_millis)
    }

    /// Parsed JSON error body, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Whether this error came from a 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Http { status, .. } => match status {
                401 | 403 => ApiErrorCategory::Authentication,
                429 => ApiErrorCategory::RateLimit,
                500..=599 => ApiErrorCategory::Server,
                _ => ApiErrorCategory::Client,
            },
            Self::Network(_) => ApiErrorCategory::Network,
            Self::Serialization(_) => ApiErrorCategory::Server,
            Self::Config(_) | Self::Storage(_) => ApiErrorCategory::Config,
        }
    }

    /// Whether a caller may reasonably try the same request again later
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_http_error_displays_message_verbatim() {
        let err = ApiError::http(400, "Invalid input");
        assert_eq!(err.to_string(), "Invalid input");
        assert_eq!(err.message(), "Invalid input");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ApiError::http(401, "x").category(), ApiErrorCategory::Authentication);
        assert_eq!(ApiError::http(403, "x").category(), ApiErrorCategory::Authentication);
        assert_eq!(ApiError::http(429, "x").category(), ApiErrorCategory::RateLimit);
        assert_eq!(ApiError::http(503, "x").category(), ApiErrorCategory::Server);
        assert_eq!(ApiError::http(404, "x").category(), ApiErrorCategory::Client);
        assert_eq!(ApiError::Network("x".into()).category(), ApiErrorCategory::Network);
        assert_eq!(ApiError::Storage("x".into()).category(), ApiErrorCategory::Config);
    }

    #[test]
    fn test_should_retry() {
        assert!(ApiError::http(429, "x").should_retry());
        assert!(ApiError::http(502, "x").should_retry());
        assert!(ApiError::Network("x".into()).should_retry());
        assert!(!ApiError::http(401, "x").should_retry());
        assert!(!ApiError::http(422, "x").should_retry());
        assert!(!ApiError::Config("x".into()).should_retry());
    }

    #[test]
    fn test_auxiliary_data_accessors() {
        let err = ApiError::Http {
            status: 429,
            message: "Too many requests".into(),
            retry_after_ms: Some(2000),
            body: Some(json!({"error": "Too many requests"})),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(err.body().and_then(|b| b["error"].as_str()), Some("Too many requests"));
        assert!(!err.is_unauthorized());

        let network = ApiError::Network("connection refused".into());
        assert_eq!(network.status(), None);
        assert_eq!(network.retry_after_ms(), None);
        assert_eq!(network.message(), "Network error: connection refused");
    }
}
