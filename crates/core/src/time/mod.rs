//! Time abstractions
//!
//! Cooldown deadlines come from a [`Clock`] and backoff waits go through a
//! [`Sleeper`], which lets tests drive the retry engine with virtual time.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Clock abstraction for testability
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock), used for HTTP-date headers
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let elapsed = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default();
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Suspends the current task for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert!(clock.millis_since_epoch() > 0);
    }

    #[test]
    fn test_arc_clock_delegates() {
        let clock = Arc::new(SystemClock);
        let before = Instant::now();
        assert!(clock.now() >= before);
    }

    struct CountingSleeper(std::sync::Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for CountingSleeper {
        async fn sleep(&self, duration: Duration) {
            if let Ok(mut calls) = self.0.lock() {
                calls.push(duration);
            }
        }
    }

    #[tokio::test]
    async fn test_sleeper_is_object_safe() {
        let sleeper = CountingSleeper(std::sync::Mutex::new(Vec::new()));
        let dyn_sleeper: &dyn Sleeper = &sleeper;
        dyn_sleeper.sleep(Duration::from_millis(5)).await;
        assert_eq!(sleeper.0.lock().unwrap().as_slice(), &[Duration::from_millis(5)]);
    }
}
