//! Backoffice REST client
//!
//! Every verb prefixes the resolved base URL, attaches the bearer token
//! read fresh from storage, and passes the response through the
//! [`ResponseHandler`]. GETs additionally go through the [`RetryEngine`].

use std::sync::Arc;

use backoffice_core::{
    AccessTokenProvider, Clock, KeyValueStore, Navigator, NoopSessionObserver, SessionObserver,
    Sleeper, SystemClock,
};
use backoffice_domain::{ApiError, ClientConfig, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::auth::{load_auth_headers, StoredTokenProvider};
use super::session::LoginRedirect;
use crate::errors::InfraError;
use crate::http::{BaseUrl, CooldownState, HttpClient, ResponseHandler, RetryEngine};
use crate::storage::{ErrorLog, FileStore, MemoryStore};
use crate::time::TokioSleeper;

/// Shared request wrapper used by every page of the back office
///
/// Cheap to clone; clones share cooldown state, storage and the error log.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: BaseUrl,
    tokens: Arc<dyn AccessTokenProvider>,
    handler: ResponseHandler,
    retry: RetryEngine,
}

impl ApiClient {
    /// Client with default ports for the given configuration
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the configuration is invalid or the
    /// transport cannot be built, `ApiError::Storage` if the storage
    /// directory cannot be opened.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Client configured from the environment or a config file
    ///
    /// # Errors
    /// Returns `ApiError::Config` if no configuration can be loaded.
    pub fn from_env() -> Result<Self> {
        Self::new(crate::config::load()?)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Diagnostics log of failed requests
    pub fn error_log(&self) -> &ErrorLog {
        self.handler.error_log()
    }

    pub fn cooldowns(&self) -> &CooldownState {
        self.retry.cooldowns()
    }

    /// Execute a GET request, retried according to the retry policy
    ///
    /// # Errors
    /// Returns `ApiError::Http` for non-success statuses, `ApiError::Network`
    /// for transport failures and `ApiError::Serialization` if the body does
    /// not decode into `T`.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.fetch(path).await?;
        let result = decode_json(response).await?;
        debug!(path = %path, "GET request successful");
        Ok(result)
    }

    /// Execute a GET request and return the raw body
    ///
    /// # Errors
    /// Same as [`ApiClient::get`], minus decoding.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_blob(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.fetch(path).await?;
        let bytes = response.bytes().await.map_err(|e| ApiError::from(InfraError::from(e)))?;
        debug!(path = %path, size = bytes.len(), "GET blob successful");
        Ok(bytes.to_vec())
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Errors
    /// See [`ApiClient::get`]; also `ApiError::Serialization` if `body`
    /// cannot be encoded.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// Execute a PATCH request with a JSON body
    ///
    /// # Errors
    /// See [`ApiClient::post`].
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    /// See [`ApiClient::get`].
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_once(self.request(Method::DELETE, path).await).await?;
        decode_json(response).await
    }

    /// POST a multipart form; reqwest sets the content type and boundary
    ///
    /// # Errors
    /// See [`ApiClient::get`].
    #[instrument(skip(self, form), fields(path = %path))]
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let request = self.request(Method::POST, path).await.multipart(form);
        let response = self.send_once(request).await?;
        decode_json(response).await
    }

    /// PATCH a multipart form
    ///
    /// # Errors
    /// See [`ApiClient::get`].
    #[instrument(skip(self, form), fields(path = %path))]
    pub async fn upload_patch<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let request = self.request(Method::PATCH, path).await.multipart(form);
        let response = self.send_once(request).await?;
        decode_json(response).await
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let headers = load_auth_headers(Arc::clone(&self.tokens)).await;
        self.http.request(method, self.base_url.join(path)).headers(headers)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| ApiError::from(InfraError::from(e)))?;
        let request = self
            .request(method, path)
            .await
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(payload);
        let response = self.send_once(request).await?;
        decode_json(response).await
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.http.send(request).await?;
        self.handler.handle(response).await
    }

    /// GET through the retry engine, rebuilding the request per attempt so
    /// each one carries the current token.
    async fn fetch(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path);
        let http = &self.http;
        let tokens = &self.tokens;
        let target = url.as_str();

        let outcome = self
            .retry
            .execute(&Method::GET, target, move || {
                let tokens = Arc::clone(tokens);
                async move {
                    let headers = load_auth_headers(tokens).await;
                    http.send(http.request(Method::GET, target).headers(headers)).await
                }
            })
            .await?;

        if outcome.attempts > 1 || !outcome.cooldown_waits.is_empty() {
            debug!(
                attempts = outcome.attempts,
                total_delay = ?outcome.total_delay(),
                "GET completed after backoff"
            );
        }

        self.handler.handle(outcome.response).await
    }
}

/// Decode a JSON success body; empty bodies decode from `null`.
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return decode_empty(status);
    }

    let bytes = response.bytes().await.map_err(|e| ApiError::from(InfraError::from(e)))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return decode_empty(status);
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::Serialization(format!("Failed to parse response: {e}")))
}

fn decode_empty<T: DeserializeOwned>(status: StatusCode) -> Result<T> {
    serde_json::from_value(Value::Null).map_err(|_| {
        ApiError::Serialization(format!(
            "Empty response ({}), but response type cannot be deserialized from an empty body",
            status.as_u16()
        ))
    })
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn KeyValueStore>>,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
    session: Option<Arc<dyn SessionObserver>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    cooldowns: Option<CooldownState>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Persistent store for the token, identity and error log
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Token source; defaults to the token kept in the store
    pub fn tokens(mut self, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Observer notified after a 401; takes precedence over [`Self::navigator`]
    pub fn session_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.session = Some(observer);
        self
    }

    /// Redirect to the configured login path after a 401
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Share cooldown deadlines with another client
    pub fn cooldowns(mut self, cooldowns: CooldownState) -> Self {
        self.cooldowns = Some(cooldowns);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the storage directory
    /// cannot be opened, or the transport cannot be built
    pub fn build(self) -> Result<ApiClient> {
        let config = self.config.unwrap_or_default();
        config.validate().map_err(ApiError::Config)?;

        let store: Arc<dyn KeyValueStore> = match (self.store, &config.storage_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(FileStore::open(dir)?),
            (None, None) => Arc::new(MemoryStore::new()),
        };
        let tokens =
            self.tokens.unwrap_or_else(|| Arc::new(StoredTokenProvider::new(Arc::clone(&store))));
        let session: Arc<dyn SessionObserver> = match (self.session, self.navigator) {
            (Some(session), _) => session,
            (None, Some(navigator)) => {
                Arc::new(LoginRedirect::with_login_path(navigator, config.login_path.clone()))
            }
            (None, None) => Arc::new(NoopSessionObserver),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        let http = HttpClient::builder().timeout(config.timeout()).build()?;
        let base_url = BaseUrl::resolve(config.api_base_url.as_deref(), config.host.as_deref());
        let error_log = ErrorLog::with_capacity(Arc::clone(&store), config.error_log_capacity);
        let handler = ResponseHandler::new(
            store,
            session,
            error_log,
            config.fallback_messages.clone(),
            Arc::clone(&clock),
        );
        let cooldowns = self.cooldowns.unwrap_or_default();
        let retry = RetryEngine::new(config.retry, cooldowns, clock, sleeper);

        info!(base_url = %base_url, "API client ready");

        Ok(ApiClient { http, base_url, tokens, handler, retry })
    }
}
