//! Normalization of non-success responses into [`ApiError`]
//!
//! Servers answer failures with JSON error objects, plain text, or (behind
//! a gateway) whole HTML pages. All of them end up as an `ApiError::Http`
//! carrying a message that can be shown to a user.

use std::sync::Arc;

use backoffice_core::{Clock, KeyValueStore, SessionObserver};
use backoffice_domain::{ApiError, ErrorLogEntry, FallbackMessages, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::retry_after::retry_after_ms;
use crate::api::session::clear_session;
use crate::storage::ErrorLog;

static HTML_PREFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(<!doctype\s+html|<html[\s>])").ok());
static TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]*>").ok());

/// Message and diagnostics extracted from an error body
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    pub body: Option<Value>,
    pub is_html: bool,
}

/// Extract a user-facing message from an error response body.
pub fn normalize_error_body(
    status: u16,
    content_type: Option<&str>,
    text: &str,
    fallback: &FallbackMessages,
) -> ErrorBody {
    if content_type.is_some_and(is_json_content_type) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            let message = message_field(&value, "error")
                .or_else(|| message_field(&value, "message"))
                .map_or_else(|| format!("HTTP {status}"), str::to_string);
            return ErrorBody { message, body: Some(value), is_html: false };
        }
        debug!(status, "error body declared JSON but did not parse, treating as text");
    }

    let html_type = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
    if html_type || looks_like_html(text) {
        return ErrorBody { message: fallback.message_for(status), body: None, is_html: true };
    }

    let stripped = strip_tags(text);
    let message = if stripped.is_empty() { fallback.message_for(status) } else { stripped };
    ErrorBody { message, body: None, is_html: false }
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

fn message_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn looks_like_html(text: &str) -> bool {
    HTML_PREFIX.as_ref().is_some_and(|re| re.is_match(text))
}

fn strip_tags(text: &str) -> String {
    let without_tags = match TAG.as_ref() {
        Some(re) => re.replace_all(text, " "),
        None => text.into(),
    };
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turns raw responses into results, with the 401 and error-log side effects
#[derive(Clone)]
pub struct ResponseHandler {
    store: Arc<dyn KeyValueStore>,
    session: Arc<dyn SessionObserver>,
    error_log: ErrorLog,
    fallback: FallbackMessages,
    clock: Arc<dyn Clock>,
}

impl ResponseHandler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        session: Arc<dyn SessionObserver>,
        error_log: ErrorLog,
        fallback: FallbackMessages,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, session, error_log, fallback, clock }
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Pass successful responses through; convert everything else into an
    /// error.
    ///
    /// A 401 clears the stored session and notifies the observer before
    /// the body is looked at.
    ///
    /// # Errors
    /// Returns `ApiError::Http` for any status outside 2xx/3xx.
    pub async fn handle(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!(url = %response.url(), "request rejected with 401, clearing session");
            let store = Arc::clone(&self.store);
            let cleared = tokio::task::spawn_blocking(move || clear_session(store.as_ref())).await;
            if let Err(err) = cleared {
                warn!(error = %err, "clearing the stored session failed");
            }
            self.session.session_invalidated();
        }

        let retry_after_ms = retry_after_ms(response.headers(), self.clock.as_ref());
        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
        let url = response.url().to_string();
        let text = response.text().await.unwrap_or_else(|err| {
            debug!(error = %err, "failed to read error body");
            String::new()
        });

        let code = status.as_u16();
        let ErrorBody { message, body, is_html } =
            normalize_error_body(code, content_type.as_deref(), &text, &self.fallback);

        warn!(status = code, %url, %message, is_html, "API request failed");

        let entry = ErrorLogEntry::new(url, code, message.clone())
            .with_body(body.clone())
            .with_html(is_html);
        let error_log = self.error_log.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || error_log.record(entry)).await {
            debug!(error = %err, "error log task failed");
        }

        Err(ApiError::Http { status: code, message, retry_after_ms, body })
    }
}
