//! Shared cooldown deadlines for rate-limited GETs
//!
//! One global deadline applies to every retry-wrapped GET; per-route
//! deadlines apply to a single resource of a cooldown family
//! (`messages:<chatId>`, ...). Deadlines only ever move forward.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Deadlines {
    global: Option<Instant>,
    routes: HashMap<String, Instant>,
}

/// Cooldown deadlines shared by every clone of a client
///
/// Each call takes the lock for a single read or update; the lock is never
/// held while waiting.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    inner: Arc<Mutex<Deadlines>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current global deadline, whether or not it has passed
    pub fn global_deadline(&self) -> Option<Instant> {
        self.inner.lock().global
    }

    /// Current deadline of a route key
    pub fn route_deadline(&self, key: &str) -> Option<Instant> {
        self.inner.lock().routes.get(key).copied()
    }

    /// Time left before the global deadline, if it lies after `now`
    pub fn global_remaining(&self, now: Instant) -> Option<Duration> {
        remaining(self.global_deadline(), now)
    }

    /// Time left before a route's deadline, if it lies after `now`
    pub fn route_remaining(&self, key: &str, now: Instant) -> Option<Duration> {
        remaining(self.route_deadline(key), now)
    }

    /// Move the global deadline to `deadline` unless it is already later.
    pub fn extend_global(&self, deadline: Instant) {
        let mut inner = self.inner.lock();
        inner.global = Some(inner.global.map_or(deadline, |current| current.max(deadline)));
    }

    /// Move a route's deadline to `deadline` unless it is already later.
    ///
    /// Expired routes are dropped on the way so the map stays small.
    pub fn extend_route(&self, key: &str, deadline: Instant, now: Instant) {
        let mut inner = self.inner.lock();
        inner.routes.retain(|_, at| *at > now);
        inner
            .routes
            .entry(key.to_string())
            .and_modify(|current| *current = (*current).max(deadline))
            .or_insert(deadline);
    }

    /// Number of routes with a recorded deadline, expired ones included
    pub fn tracked_routes(&self) -> usize {
        self.inner.lock().routes.len()
    }

    /// Forget every deadline
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.global = None;
        inner.routes.clear();
    }
}

fn remaining(deadline: Option<Instant>, now: Instant) -> Option<Duration> {
    deadline.and_then(|at| at.checked_duration_since(now)).filter(|d| !d.is_zero())
}
