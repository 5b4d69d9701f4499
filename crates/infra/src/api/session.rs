//! Session invalidation after a 401

use backoffice_core::{KeyValueStore, Navigator, SessionObserver};
use backoffice_domain::constants::{storage_keys, DEFAULT_LOGIN_PATH};
use tracing::{debug, info};

/// Remove the persisted token and identity.
///
/// Every key is attempted even if an earlier removal fails.
pub fn clear_session(store: &dyn KeyValueStore) {
    for key in storage_keys::SESSION_KEYS {
        if let Err(err) = store.remove(key) {
            debug!(key, error = %err, "failed to clear session key");
        }
    }
}

/// Sends the user to the login page once the session is gone
#[derive(Debug, Clone)]
pub struct LoginRedirect<N: Navigator> {
    navigator: N,
    login_path: String,
}

impl<N: Navigator> LoginRedirect<N> {
    pub fn new(navigator: N) -> Self {
        Self::with_login_path(navigator, DEFAULT_LOGIN_PATH)
    }

    pub fn with_login_path(navigator: N, login_path: impl Into<String>) -> Self {
        Self { navigator, login_path: login_path.into() }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }
}

impl<N: Navigator> SessionObserver for LoginRedirect<N> {
    fn session_invalidated(&self) {
        if self.navigator.current_path().as_deref() == Some(self.login_path.as_str()) {
            debug!("already on the login page, not redirecting");
            return;
        }
        info!(login_path = %self.login_path, "session expired, redirecting to login");
        self.navigator.navigate(&self.login_path);
    }
}
