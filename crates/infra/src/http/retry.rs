//! Rate-limit aware retries for GET requests
//!
//! Only GETs are retried. URLs matching a cooldown route (chat messages,
//! chat lists) are never retried; a 429 on them instead opens a cooldown
//! window for that resource and for all GETs. Every other GET is retried on
//! the configured statuses with capped exponential backoff.
//!
//! ```text
//! base   = min(initial * 2^attempt, max_backoff)
//! wait   = max(base, Retry-After)
//! global = now + clamp(wait + jitter, global_min, global_max)
//! route  = now + max(route_min, wait) + jitter
//! sleep  = max(min_sleep, wait)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoffice_core::{Clock, Sleeper};
use backoffice_domain::{CooldownRoute, Result, RetryConfig};
use rand::Rng;
use reqwest::{Method, Response};
use tracing::{debug, warn};
use url::Url;

use super::cooldown::CooldownState;
use super::retry_after::retry_after_ms;

const RELATIVE_URL_BASE: &str = "http://relative.invalid/";

/// How a request takes part in retries and cooldowns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClass {
    /// Not a GET: dispatched once, cooldowns ignored
    Ineligible,
    /// GET on a cooldown route: never retried, honours its route deadline
    CooldownOnly { key: String },
    /// Any other GET: retried with backoff
    Standard,
}

/// Deadlines and sleep derived for one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindow {
    pub wait: Duration,
    pub jitter: Duration,
    /// Length of the global cooldown, already clamped
    pub global: Duration,
    /// Length of the route cooldown, jitter included
    pub route: Duration,
    /// Backoff before the next attempt
    pub sleep: Duration,
}

/// Result of [`RetryEngine::execute`]
#[derive(Debug)]
pub struct RetryOutcome {
    /// Last response received, whatever its status
    pub response: Response,
    pub attempts: u32,
    /// Backoff sleeps between attempts, in order
    pub backoff_delays: Vec<Duration>,
    /// Waits for global or route cooldowns before dispatching
    pub cooldown_waits: Vec<Duration>,
}

impl RetryOutcome {
    fn single(response: Response) -> Self {
        Self { response, attempts: 1, backoff_delays: Vec::new(), cooldown_waits: Vec::new() }
    }

    pub fn total_delay(&self) -> Duration {
        self.backoff_delays.iter().chain(&self.cooldown_waits).sum()
    }
}

/// Retry loop shared by every GET of a client
#[derive(Clone)]
pub struct RetryEngine {
    config: RetryConfig,
    cooldowns: CooldownState,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryEngine {
    pub fn new(
        config: RetryConfig,
        cooldowns: CooldownState,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self { config, cooldowns, clock, sleeper }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn cooldowns(&self) -> &CooldownState {
        &self.cooldowns
    }

    pub fn classify(&self, method: &Method, url: &str) -> RouteClass {
        if *method != Method::GET {
            return RouteClass::Ineligible;
        }
        match self.config.cooldown_routes.iter().find(|route| url.contains(&route.path_fragment)) {
            Some(route) => RouteClass::CooldownOnly { key: cooldown_key(route, url) },
            None => RouteClass::Standard,
        }
    }

    /// Window for a failed attempt, given the jitter to apply
    pub fn window(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        jitter: Duration,
    ) -> CooldownWindow {
        let base = self.config.base_backoff(attempt);
        let wait = retry_after.map_or(base, |ra| base.max(ra));
        let global = (wait + jitter)
            .max(self.config.global_cooldown_min())
            .min(self.config.global_cooldown_max());
        let route = wait.max(self.config.route_cooldown_min()) + jitter;
        let sleep = wait.max(self.config.min_backoff_sleep());
        CooldownWindow { wait, jitter, global, route, sleep }
    }

    fn jitter(&self) -> Duration {
        if self.config.max_jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..self.config.max_jitter_ms))
    }

    /// Compute a window and push the shared deadlines forward.
    fn open_window(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        route_key: Option<&str>,
    ) -> CooldownWindow {
        let window = self.window(attempt, retry_after, self.jitter());
        let now = self.clock.now();
        self.cooldowns.extend_global(now + window.global);
        if let Some(key) = route_key {
            self.cooldowns.extend_route(key, now + window.route, now);
        }
        window
    }

    async fn wait_for_cooldowns(&self, route_key: Option<&str>, waits: &mut Vec<Duration>) {
        if let Some(wait) = self.cooldowns.global_remaining(self.clock.now()) {
            debug!(?wait, "waiting for global cooldown");
            self.sleeper.sleep(wait).await;
            waits.push(wait);
        }

        if let Some(key) = route_key {
            if let Some(wait) = self.cooldowns.route_remaining(key, self.clock.now()) {
                debug!(route = key, ?wait, "waiting for route cooldown");
                self.sleeper.sleep(wait).await;
                waits.push(wait);
            }
        }
    }

    /// Run `dispatch` under the retry and cooldown policy for `method`/`url`.
    ///
    /// `dispatch` is called once per attempt and must build a fresh request
    /// each time. The last response is returned whatever its status;
    /// transport errors end the loop immediately.
    ///
    /// # Errors
    /// Returns the first error produced by `dispatch`.
    pub async fn execute<F, Fut>(
        &self,
        method: &Method,
        url: &str,
        mut dispatch: F,
    ) -> Result<RetryOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let (route_key, max_retries) = match self.classify(method, url) {
            RouteClass::Ineligible => return Ok(RetryOutcome::single(dispatch().await?)),
            RouteClass::CooldownOnly { key } => (Some(key), 0),
            RouteClass::Standard => (None, self.config.max_retries),
        };

        let mut attempt = 0_u32;
        let mut backoff_delays = Vec::new();
        let mut cooldown_waits = Vec::new();

        loop {
            self.wait_for_cooldowns(route_key.as_deref(), &mut cooldown_waits).await;

            debug!(attempt = attempt + 1, %url, "dispatching GET");
            let response = dispatch().await?;
            let status = response.status().as_u16();
            let retry_after =
                retry_after_ms(response.headers(), self.clock.as_ref()).map(Duration::from_millis);

            if let (Some(key), 429) = (route_key.as_deref(), status) {
                let window = self.open_window(attempt, retry_after, Some(key));
                warn!(
                    route = key,
                    global = ?window.global,
                    cooldown = ?window.route,
                    "rate limited, cooling down route"
                );
            }

            if self.config.is_retryable(status) && attempt < max_retries {
                let window = self.open_window(attempt, retry_after, route_key.as_deref());
                if status == 429 {
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        sleep = ?window.sleep,
                        "rate limited, backing off"
                    );
                } else {
                    debug!(
                        %url,
                        status,
                        attempt = attempt + 1,
                        sleep = ?window.sleep,
                        "retryable status, backing off"
                    );
                }
                drop(response);
                self.sleeper.sleep(window.sleep).await;
                backoff_delays.push(window.sleep);
                attempt += 1;
                continue;
            }

            return Ok(RetryOutcome {
                response,
                attempts: attempt + 1,
                backoff_delays,
                cooldown_waits,
            });
        }
    }
}

/// `<family>:<value of the route's key parameter>`, empty when absent
pub fn cooldown_key(route: &CooldownRoute, url: &str) -> String {
    let resource = query_param(url, &route.key_param).unwrap_or_default();
    format!("{}:{}", route.family, resource)
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse(RELATIVE_URL_BASE).and_then(|base| base.join(url)))
        .ok()?;
    parsed.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
}
