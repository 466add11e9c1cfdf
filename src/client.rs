//! Session & request client for the Voxa backend.
//!
//! Two transports share one token store:
//! - the structured transport: JSON bodies, default `Content-Type:
//!   application/json`, per-operation timeout, bearer token attached when
//!   one is stored
//! - the raw transport: multipart bodies, only `Authorization` is set so the
//!   multipart boundary header is left to reqwest
//!
//! Every failure is normalized into [`ApiError`] at the call boundary.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorKind, StorageError};
use crate::models::{AuthResponse, Credentials, Recording, UserProfile};
use crate::request::{MultipartBody, RequestBody};
use crate::token_store::TokenStore;

const REGISTER_FAILED: &str = "Registration failed";
const LOGIN_FAILED: &str = "Login failed";
const PROFILE_UPDATE_FAILED: &str = "Profile update failed";
const SAVE_RECORDING_FAILED: &str = "Failed to save recording";
const FETCH_RECORDINGS_FAILED: &str = "Failed to fetch recordings";
const GET_USER_FAILED: &str = "Failed to get user data";
const HEALTH_FAILED: &str = "Cannot reach server";

/// Token lifecycle. No refresh or expiry transitions exist: an expired
/// token shows up as a 401 on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Present,
}

pub struct SessionClient {
    base_url: String,
    api_url: String,
    json_http: Client,
    raw_http: Client,
    store: Arc<dyn TokenStore>,
    request_timeout: Duration,
    upload_timeout: Duration,
    health_timeout: Duration,
}

impl SessionClient {
    pub fn new(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        let base_url = config.resolve_base_url();
        let api_url = format!("{}/api", base_url);
        let request_timeout = config.request_timeout();

        let mut json_headers = HeaderMap::new();
        json_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let json_http = Client::builder()
            .default_headers(json_headers)
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        let raw_http = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        log::info!("Api: using API URL {}", api_url);

        Self {
            base_url,
            api_url,
            json_http,
            raw_http,
            store,
            request_timeout,
            upload_timeout: config.upload_timeout(),
            health_timeout: config.health_timeout(),
        }
    }

    /// Client with the token store named by `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config, config.token_store())
    }

    /// `<origin>/api`
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Create an account. A token in the response starts a session.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials { email, password };
        let value = self
            .send_json(
                Method::POST,
                "/auth/register",
                Some(&credentials),
                self.request_timeout,
                REGISTER_FAILED,
            )
            .await?;
        self.persist_token(&value).await;
        decode(value, REGISTER_FAILED)
    }

    /// Log in and persist the returned token before returning.
    ///
    /// The token is taken from the raw body, so it is stored even when the
    /// rest of the payload is unusual. A failure to persist the token is
    /// logged and does not fail the login.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        log::info!("Api: attempting login to {}/auth/login", self.api_url);
        let credentials = Credentials { email, password };
        let value = self
            .send_json(
                Method::POST,
                "/auth/login",
                Some(&credentials),
                self.request_timeout,
                LOGIN_FAILED,
            )
            .await?;
        self.persist_token(&value).await;
        decode(value, LOGIN_FAILED)
    }

    /// Forget the session token. Storage failures are logged only.
    pub async fn logout(&self) {
        match self.with_store(|store| store.delete()).await {
            Ok(()) => log::info!("Api: logged out"),
            Err(e) => log::warn!("Api: logout error: {}", e),
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current_token().await.is_some()
    }

    /// Current token; read failures count as no token.
    pub async fn token(&self) -> Option<String> {
        self.current_token().await
    }

    pub async fn session_state(&self) -> SessionState {
        match self.current_token().await {
            Some(_) => SessionState::Present,
            None => SessionState::Absent,
        }
    }

    // ------------------------------------------------------------------
    // Profile & recordings
    // ------------------------------------------------------------------

    pub async fn update_profile(
        &self,
        body: impl Into<RequestBody>,
    ) -> Result<UserProfile, ApiError> {
        log::info!("Api: updating profile at {}/auth/profile", self.api_url);
        let value = self
            .send(
                Method::PUT,
                "/auth/profile",
                body.into(),
                self.request_timeout,
                PROFILE_UPDATE_FAILED,
            )
            .await?;
        log::info!("Api: profile update successful");
        decode(unwrap_envelope(value, "user"), PROFILE_UPDATE_FAILED)
    }

    pub async fn save_recording(&self, body: impl Into<RequestBody>) -> Result<Recording, ApiError> {
        log::info!("Api: saving recording to {}/recordings", self.api_url);
        let value = self
            .send(
                Method::POST,
                "/recordings",
                body.into(),
                self.upload_timeout,
                SAVE_RECORDING_FAILED,
            )
            .await?;
        log::info!("Api: recording saved");
        decode(unwrap_envelope(value, "recording"), SAVE_RECORDING_FAILED)
    }

    pub async fn get_recordings(&self) -> Result<Vec<Recording>, ApiError> {
        let value = self
            .send_json::<Value>(
                Method::GET,
                "/recordings",
                None,
                self.request_timeout,
                FETCH_RECORDINGS_FAILED,
            )
            .await?;
        decode(value, FETCH_RECORDINGS_FAILED)
    }

    /// The user behind the current token.
    pub async fn get_current_user(&self) -> Result<UserProfile, ApiError> {
        let mut value = self
            .send_json::<Value>(
                Method::GET,
                "/auth/verify",
                None,
                self.request_timeout,
                GET_USER_FAILED,
            )
            .await?;
        match value.get_mut("user").map(Value::take) {
            Some(user) if user.is_object() => decode(user, GET_USER_FAILED),
            _ => {
                log::error!("Api: verify response has no user object");
                Err(ApiError::fallback(
                    ErrorKind::MalformedResponse,
                    None,
                    GET_USER_FAILED,
                ))
            }
        }
    }

    /// Reachability check against `<origin>/health`. No token is sent.
    pub async fn check_health(&self) -> Result<Value, ApiError> {
        let url = format!("{}/health", self.base_url);
        log::debug!("Api: checking server health at {}", url);
        let response = self
            .raw_http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e, &url, HEALTH_FAILED))?;
        read_response(response, &url, HEALTH_FAILED).await
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Run a token store call on the blocking pool. The keyring and file
    /// stores do synchronous I/O.
    async fn with_store<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&dyn TokenStore) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
    }

    async fn current_token(&self) -> Option<String> {
        match self.with_store(|store| store.get()).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                log::warn!("Api: token retrieval error: {}", e);
                None
            }
        }
    }

    /// Store the `token` field of an auth payload, if it carries one.
    async fn persist_token(&self, payload: &Value) {
        let Some(token) = payload
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
        else {
            return;
        };
        if let Err(e) = self.with_store(move |store| store.set(&token)).await {
            log::warn!("Api: token save error: {}", e);
        }
    }

    /// Attach `Authorization: Bearer <token>` when a token is stored.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.current_token().await {
            Some(token) => {
                log::debug!("Api: token found, attaching to request");
                request.bearer_auth(token)
            }
            None => {
                log::debug!("Api: no token found");
                request
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        timeout: Duration,
        fallback: &str,
    ) -> Result<Value, ApiError> {
        match body {
            RequestBody::Json(value) => {
                self.send_json(method, path, Some(&value), timeout, fallback)
                    .await
            }
            RequestBody::Multipart(form) => {
                self.send_multipart(method, path, form, timeout, fallback)
                    .await
            }
        }
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        timeout: Duration,
        fallback: &str,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.api_url, path);
        log::info!("Api: making {} request to {}", method, path);

        let mut request = self.json_http.request(method, &url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| transport_error(&e, &url, fallback))?;
        read_response(response, &url, fallback).await
    }

    async fn send_multipart(
        &self,
        method: Method,
        path: &str,
        body: MultipartBody,
        timeout: Duration,
        fallback: &str,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.api_url, path);
        log::info!(
            "Api: using raw transport for multipart {} to {} ({} bytes attached)",
            method,
            path,
            body.payload_bytes()
        );

        let form = body.into_form().map_err(|e| {
            log::error!("Api: failed to build multipart form for {}: {}", url, e);
            ApiError::network(fallback)
        })?;
        let request = self
            .raw_http
            .request(method, &url)
            .timeout(timeout)
            .multipart(form);
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| transport_error(&e, &url, fallback))?;
        read_response(response, &url, fallback).await
    }
}

fn transport_error(e: &reqwest::Error, url: &str, fallback: &str) -> ApiError {
    let cause = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else {
        "request"
    };
    log::error!("Api: {} failure for {}: {}", cause, url, e);
    ApiError::network(fallback)
}

/// 2xx → parsed JSON body; anything else → normalized error.
async fn read_response(response: Response, url: &str, fallback: &str) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| {
        log::error!("Api: failed to read response body from {}: {}", url, e);
        if status.is_success() {
            ApiError::fallback(ErrorKind::MalformedResponse, Some(status.as_u16()), fallback)
        } else {
            ApiError::fallback(ErrorKind::Server, Some(status.as_u16()), fallback)
        }
    })?;

    if !status.is_success() {
        let err = ApiError::from_response(status.as_u16(), &text, fallback);
        log::error!("Api: {} failed ({}): {}", url, status.as_u16(), err.message());
        return Err(err);
    }

    serde_json::from_str(&text).map_err(|e| {
        log::error!("Api: unparseable response from {}: {}", url, e);
        ApiError::fallback(ErrorKind::MalformedResponse, Some(status.as_u16()), fallback)
    })
}

fn decode<T: DeserializeOwned>(value: Value, fallback: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| {
        log::error!("Api: unexpected response shape: {}", e);
        ApiError::fallback(ErrorKind::MalformedResponse, None, fallback)
    })
}

/// `{ "<key>": {...}, ... }` → the inner object; anything else unchanged.
fn unwrap_envelope(mut value: Value, key: &str) -> Value {
    match value.get_mut(key) {
        Some(inner) if inner.is_object() => inner.take(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::{FileTokenStore, MemoryTokenStore};
    use serde_json::json;

    #[test]
    fn envelope_unwrapped_only_when_object() {
        let wrapped = json!({ "message": "ok", "user": { "name": "Ada" } });
        assert_eq!(unwrap_envelope(wrapped, "user"), json!({ "name": "Ada" }));

        let bare = json!({ "name": "Ada", "user": "ada42" });
        assert_eq!(unwrap_envelope(bare.clone(), "user"), bare);
    }

    #[test]
    fn decode_failure_is_malformed() {
        let err = decode::<Vec<Recording>>(json!({ "not": "a list" }), FETCH_RECORDINGS_FAILED)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(err.body(), &json!({ "error": "Failed to fetch recordings" }));
    }

    #[tokio::test]
    async fn session_state_follows_store() {
        let store = Arc::new(MemoryTokenStore::new());
        let client = SessionClient::new(&ClientConfig::with_base_url("http://127.0.0.1:9"), store.clone());
        assert_eq!(client.session_state().await, SessionState::Absent);

        store.set("t1").unwrap();
        assert_eq!(client.session_state().await, SessionState::Present);
        assert_eq!(client.token().await.as_deref(), Some("t1"));

        client.logout().await;
        assert!(!client.is_logged_in().await);
    }

    #[tokio::test]
    async fn file_store_is_read_off_the_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FileTokenStore::new(dir.path().join("storage.json")));
        store.set("t1").unwrap();
        let client = SessionClient::new(&ClientConfig::with_base_url("http://127.0.0.1:9"), store.clone());

        assert_eq!(client.token().await.as_deref(), Some("t1"));
        client.logout().await;
        assert_eq!(client.session_state().await, SessionState::Absent);
        assert_eq!(store.get().unwrap(), None);
    }

    #[tokio::test]
    async fn token_is_taken_from_raw_payload() {
        let store = Arc::new(MemoryTokenStore::new());
        let client = SessionClient::new(&ClientConfig::with_base_url("http://127.0.0.1:9"), store.clone());

        client.persist_token(&json!({ "token": 42 })).await;
        assert_eq!(store.get().unwrap(), None);
        client.persist_token(&json!({ "token": "t1", "user": "odd" })).await;
        assert_eq!(store.get().unwrap().as_deref(), Some("t1"));
    }

    #[test]
    fn api_url_is_under_origin() {
        let client = SessionClient::new(
            &ClientConfig::with_base_url("https://api.voxa.test/"),
            Arc::new(MemoryTokenStore::new()),
        );
        assert_eq!(client.api_url(), "https://api.voxa.test/api");
    }
}
