//! Port interfaces for session handling
//!
//! These traits define the boundary between the client and whatever owns
//! the signed-in session (token storage, routing).

use std::sync::Arc;

/// Source of the bearer token attached to every request
///
/// Read on each request and never cached, so a token written by the login
/// flow is used by the very next call.
pub trait AccessTokenProvider: Send + Sync {
    /// Current token, or `None` when signed out
    fn access_token(&self) -> Option<String>;
}

/// Notified after the server rejected the session with a 401
pub trait SessionObserver: Send + Sync {
    /// Called once per 401 response, after stored credentials were cleared
    fn session_invalidated(&self);
}

/// Observer that does nothing, for headless callers
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionObserver;

impl SessionObserver for NoopSessionObserver {
    fn session_invalidated(&self) {}
}

/// Access to the application's current route
pub trait Navigator: Send + Sync {
    /// Path currently displayed, if known
    fn current_path(&self) -> Option<String>;

    /// Replace the current route with `path`
    fn navigate(&self, path: &str);
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn current_path(&self) -> Option<String> {
        (**self).current_path()
    }

    fn navigate(&self, path: &str) {
        (**self).navigate(path);
    }
}
