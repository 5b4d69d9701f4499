//! Deterministic test doubles for the time and navigation ports
//!
//! [`RecordingSleeper`] records every requested sleep and advances a
//! [`MockClock`] instead of suspending, so backoff and cooldown behaviour
//! can be asserted without waiting.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use backoffice_core::{Clock, Navigator, Sleeper};
use parking_lot::Mutex;

/// Mock clock for deterministic testing
///
/// Clones share the same elapsed time.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    start_wall: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_wall: SystemTime::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.start_wall + self.elapsed()
    }
}

/// Sleeper that records requested durations and advances a [`MockClock`]
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    clock: MockClock,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new(clock: MockClock) -> Self {
        Self { clock, sleeps: Arc::default() }
    }

    /// Every duration passed to [`Sleeper::sleep`], in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }

    pub fn clock(&self) -> &MockClock {
        &self.clock
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.clock.advance(duration);
    }
}

/// Navigator that remembers where it was sent
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    current: Arc<Mutex<Option<String>>>,
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    /// Navigator already showing `path`
    pub fn at(path: impl Into<String>) -> Self {
        let navigator = Self::default();
        *navigator.current.lock() = Some(path.into());
        navigator
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> Option<String> {
        self.current.lock().clone()
    }

    fn navigate(&self, path: &str) {
        self.visits.lock().push(path.to_string());
        *self.current.lock() = Some(path.to_string());
    }
}
