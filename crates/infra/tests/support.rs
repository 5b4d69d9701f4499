use std::sync::Arc;
use std::time::Instant;

use backoffice_core::{Clock, KeyValueStore};
use backoffice_domain::{ClientConfig, RetryConfig};
use backoffice_infra::testing::{MockClock, RecordingNavigator, RecordingSleeper};
use backoffice_infra::{ApiClient, MemoryStore};
use wiremock::MockServer;

/// A client wired to a mock server with virtual time and in-memory storage.
pub struct TestClient {
    pub server: MockServer,
    pub client: ApiClient,
    pub store: Arc<MemoryStore>,
    pub clock: MockClock,
    pub sleeper: RecordingSleeper,
    pub navigator: RecordingNavigator,
}

impl TestClient {
    /// Client with the default retry policy and a signed-in session.
    pub async fn new() -> Self {
        Self::with_retry(RetryConfig::default()).await
    }

    pub async fn with_retry(retry: RetryConfig) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::with_entries([
            ("token", "test-token"),
            ("user", r#"{"id":1,"name":"Ada"}"#),
            ("role", "admin"),
        ]));
        let clock = MockClock::new();
        let sleeper = RecordingSleeper::new(clock.clone());
        let navigator = RecordingNavigator::at("/orders");

        let config = ClientConfig {
            api_base_url: Some(format!("{}/", server.uri())),
            retry,
            ..ClientConfig::default()
        };
        let client = ApiClient::builder()
            .config(config)
            .store(store.clone())
            .navigator(Arc::new(navigator.clone()))
            .clock(Arc::new(clock.clone()))
            .sleeper(Arc::new(sleeper.clone()))
            .build()
            .expect("client should build");

        Self { server, client, store, clock, sleeper, navigator }
    }

    /// Retry policy without jitter so delays are exact.
    pub fn exact_retry() -> RetryConfig {
        RetryConfig::builder().no_jitter().build().expect("valid retry config")
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).expect("memory store never fails")
    }

    pub fn store_token(&self, token: &str) {
        self.store.set("token", token).expect("memory store never fails");
    }

    pub fn clock_now(&self) -> Instant {
        self.clock.now()
    }

    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.map(|r| r.len()).unwrap_or_default()
    }
}
