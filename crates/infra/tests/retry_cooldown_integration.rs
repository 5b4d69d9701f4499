//! Integration tests for GET retries and rate-limit cooldowns
//!
//! Time is virtual: the recording sleeper advances the mock clock instead of
//! blocking, so multi-second cooldowns run instantly.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoffice_domain::{ApiError, FallbackMessages, RetryConfig};
use backoffice_infra::http::HttpClient;
use backoffice_infra::testing::{MockClock, RecordingSleeper};
use backoffice_infra::{CooldownState, RetryEngine};
use reqwest::Method;
use serde_json::{json, Value};
use support::TestClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Fails with `status` for the first `failures` calls, then succeeds.
struct FlakyResponder {
    calls: Arc<AtomicUsize>,
    failures: usize,
    status: u16,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ResponseTemplate::new(self.status)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
        }
    }
}

fn engine(clock: &MockClock, sleeper: &RecordingSleeper) -> RetryEngine {
    RetryEngine::new(
        RetryConfig::default(),
        CooldownState::new(),
        Arc::new(clock.clone()),
        Arc::new(sleeper.clone()),
    )
}

// ============================================================================
// Standard GET retries
// ============================================================================

#[tokio::test]
async fn get_recovers_after_three_unavailable_responses() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(FlakyResponder { calls: calls.clone(), failures: 3, status: 503 })
        .mount(&server)
        .await;

    let clock = MockClock::new();
    let sleeper = RecordingSleeper::new(clock.clone());
    let retry = engine(&clock, &sleeper);
    let http = HttpClient::new().unwrap();
    let url = format!("{}/api/orders", server.uri());

    let outcome = retry
        .execute(&Method::GET, &url, || http.send(http.request(Method::GET, url.as_str())))
        .await
        .unwrap();

    assert_eq!(outcome.response.status().as_u16(), 200);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(outcome.backoff_delays.len(), 3);
    assert!(outcome.backoff_delays.iter().all(|d| *d >= Duration::from_millis(200)));
    assert!(outcome.backoff_delays.iter().all(|d| *d <= Duration::from_millis(3000)));
    assert!(outcome.backoff_delays.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        outcome.backoff_delays,
        vec![Duration::from_millis(400), Duration::from_millis(800), Duration::from_millis(1600)]
    );
}

#[tokio::test]
async fn client_get_returns_body_after_transient_gateway_errors() {
    let ctx = TestClient::with_retry(TestClient::exact_retry()).await;
    Mock::given(method("GET"))
        .respond_with(FlakyResponder {
            calls: Arc::new(AtomicUsize::new(0)),
            failures: 2,
            status: 502,
        })
        .mount(&ctx.server)
        .await;

    let body: Value = ctx.client.get("/api/investments").await.unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(ctx.request_count().await, 3);
    assert!(ctx.client.error_log().entries().unwrap().is_empty());
    // two backoff sleeps plus global cooldown waits before each retry
    assert!(ctx.sleeper.total_slept() >= Duration::from_millis(1200));
}

#[tokio::test]
async fn exhausted_retries_surface_last_failure() {
    let ctx = TestClient::with_retry(TestClient::exact_retry()).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.server)
        .await;

    let err = ctx.client.get::<Value>("/api/orders").await.unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 503, .. }));
    assert_eq!(err.message(), FallbackMessages::default().server_error);
    assert_eq!(ctx.request_count().await, 4);
    assert_eq!(ctx.client.error_log().entries().unwrap().len(), 1);
}

#[tokio::test]
async fn non_retryable_status_is_not_retried() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let err = ctx.client.get::<Value>("/api/orders").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(ctx.request_count().await, 1);
    assert!(ctx.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn writes_are_never_retried() {
    let ctx = TestClient::new().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .mount(&ctx.server)
        .await;

    let post = ctx.client.post::<_, Value>("/api/orders", &json!({"sku": "A-1"})).await;
    let patch = ctx.client.patch::<_, Value>("/api/orders/1", &json!({"qty": 2})).await;

    assert_eq!(post.unwrap_err().status(), Some(503));
    assert_eq!(patch.unwrap_err().retry_after_ms(), Some(5000));
    assert_eq!(ctx.request_count().await, 2);
    assert!(ctx.sleeper.sleeps().is_empty());
    assert_eq!(ctx.client.cooldowns().global_deadline(), None);
}

// ============================================================================
// Cooldown routes
// ============================================================================

#[tokio::test]
async fn rate_limited_chat_route_opens_cooldowns_without_retrying() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .and(query_param("chatId", "42"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx.client.get::<Value>("/api/messages?chatId=42").await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.retry_after_ms(), Some(2000));
    assert!(ctx.sleeper.sleeps().is_empty());

    let now = ctx.clock_now();
    let cooldowns = ctx.client.cooldowns();
    assert!(cooldowns.global_remaining(now).unwrap() >= Duration::from_millis(2000));
    assert!(cooldowns.route_remaining("messages:42", now).unwrap() >= Duration::from_millis(2000));
    assert_eq!(cooldowns.route_remaining("messages:43", now), None);
}

#[tokio::test]
async fn next_get_on_cooled_route_waits_for_its_deadline() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .and(path("/api/chats"))
        .respond_with(FlakyResponder {
            calls: Arc::new(AtomicUsize::new(0)),
            failures: 1,
            status: 429,
        })
        .mount(&ctx.server)
        .await;

    let first = ctx.client.get::<Value>("/api/chats?userId=7").await;
    assert_eq!(first.unwrap_err().status(), Some(429));

    let second: Value = ctx.client.get("/api/chats?userId=7").await.unwrap();

    assert_eq!(second, json!({"ok": true}));
    assert!(!ctx.sleeper.sleeps().is_empty());
    // the route deadline is at least 2s out, covering the shorter global one
    assert!(ctx.sleeper.total_slept() >= Duration::from_millis(2000));
    assert_eq!(ctx.request_count().await, 2);
}

#[tokio::test]
async fn other_resources_only_wait_for_global_cooldown() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .and(query_param("chatId", "1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("chatId", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&ctx.server)
        .await;

    let _ = ctx.client.get::<Value>("/api/messages?chatId=1").await;
    let _: Value = ctx.client.get("/api/messages?chatId=2").await.unwrap();

    let sleeps = ctx.sleeper.sleeps();
    assert_eq!(sleeps.len(), 1);
    assert!(sleeps[0] >= Duration::from_millis(1500));
    assert!(sleeps[0] < Duration::from_millis(2000));
}

#[tokio::test]
async fn server_errors_on_cooldown_routes_are_surfaced_immediately() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&ctx.server)
        .await;

    let err = ctx.client.get::<Value>("/api/messages?chatId=9").await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(ctx.request_count().await, 1);
    assert_eq!(ctx.client.cooldowns().global_deadline(), None);
    assert_eq!(ctx.client.cooldowns().tracked_routes(), 0);
}

#[tokio::test]
async fn cooldowns_are_shared_between_client_clones() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&ctx.server)
        .await;

    let clone = ctx.client.clone();
    let _ = clone.get::<Value>("/api/messages?chatId=5").await;

    let now = ctx.clock_now();
    let remaining = ctx.client.cooldowns().route_remaining("messages:5", now).unwrap();
    assert!(remaining >= Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_rate_limit_slows_down_sibling_reads() {
    let ctx = TestClient::new().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "4")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&ctx.server)
        .await;
    // still in flight when the 429 above lands
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(400)))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&ctx.server)
        .await;

    let limited = {
        let client = ctx.client.clone();
        tokio::spawn(async move { client.get::<Value>("/api/messages?chatId=1").await })
    };
    let sibling = {
        let client = ctx.client.clone();
        tokio::spawn(async move { client.get::<Value>("/api/orders").await })
    };

    let limited = limited.await.unwrap();
    let sibling = sibling.await.unwrap();

    assert_eq!(limited.unwrap_err().status(), Some(429));
    assert_eq!(sibling.unwrap(), json!([{"id": 1}]));
    assert_eq!(ctx.request_count().await, 3);

    // 400ms backoff of the sibling, then the rest of the 4s global cooldown
    let sleeps = ctx.sleeper.sleeps();
    assert_eq!(sleeps.first(), Some(&Duration::from_millis(400)));
    assert!(sleeps.iter().any(|wait| *wait >= Duration::from_millis(3600)));
    assert!(ctx.sleeper.total_slept() >= Duration::from_secs(4));
}
