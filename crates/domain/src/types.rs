//! Records persisted by the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One failed request, as kept in the diagnostics log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    /// URL that was requested, base URL included
    pub url: String,
    pub status: u16,
    pub message: String,
    /// Parsed JSON error body; absent for text and HTML bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Whether the server answered with an HTML page instead of an API error
    #[serde(default)]
    pub is_html: bool,
}

impl ErrorLogEntry {
    /// Entry stamped with the current time
    pub fn new(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            url: url.into(),
            status,
            message: message.into(),
            body: None,
            is_html: false,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_html(mut self, is_html: bool) -> Self {
        self.is_html = is_html;
        self
    }
}
