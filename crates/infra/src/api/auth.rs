//! Bearer token lookup and Authorization header construction

use std::sync::Arc;

use backoffice_core::{AccessTokenProvider, KeyValueStore};
use backoffice_domain::constants::storage_keys;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, warn};

/// Reads the token the login flow persisted, on every call
#[derive(Clone)]
pub struct StoredTokenProvider {
    store: Arc<dyn KeyValueStore>,
}

impl StoredTokenProvider {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl AccessTokenProvider for StoredTokenProvider {
    fn access_token(&self) -> Option<String> {
        match self.store.get(storage_keys::TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                debug!(error = %err, "token storage unreadable, sending request unauthenticated");
                None
            }
        }
    }
}

/// Fixed token, for service accounts and tests
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub Option<String>);

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// [`auth_headers`] on the blocking pool, as token stores may read from disk
pub async fn load_auth_headers(tokens: Arc<dyn AccessTokenProvider>) -> HeaderMap {
    tokio::task::spawn_blocking(move || auth_headers(tokens.as_ref())).await.unwrap_or_else(|err| {
        warn!(error = %err, "token lookup task failed, sending request unauthenticated");
        HeaderMap::new()
    })
}

/// Headers carrying `Authorization: Bearer <token>`, or none when signed out
pub fn auth_headers(tokens: &dyn AccessTokenProvider) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(token) = tokens.access_token() else {
        return headers;
    };

    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => warn!("stored token contains characters not allowed in a header, ignoring it"),
    }
    headers
}
