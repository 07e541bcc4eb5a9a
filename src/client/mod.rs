//! HTTP client for the marketplace backend.
//!
//! [`ApiClient`] attaches the current bearer token to every request. When the
//! backend answers 401 it asks the registered [`SessionRecovery`] for a fresh
//! credential and, if one was obtained, replays the request exactly once.

pub mod envelope;
pub mod recovery;
pub mod request;

pub use envelope::{error_message, ApiEnvelope};
pub use recovery::SessionRecovery;
pub use request::ApiRequest;

use std::sync::{Arc, PoisonError, RwLock, Weak};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::HearthConfig;
use crate::error::HearthError;

/// Bearer-authenticated client with a 401 recovery hook.
///
/// # Example
/// ```no_run
/// use hearth::client::ApiClient;
/// use hearth::config::HearthConfig;
///
/// # async fn example() -> hearth::error::Result<()> {
/// let client = ApiClient::new(&HearthConfig::new("https://api.example.com"))?;
/// let categories: serde_json::Value = client.get("/categories").await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: RwLock<Option<String>>,
    recovery: RwLock<Option<Weak<dyn SessionRecovery>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_token().is_some())
            .field("recovery", &self.recovery().map(|_| ".."))
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &HearthConfig) -> Result<Self, HearthError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self::with_http_client(http, &config.base_url))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: RwLock::new(None),
            recovery: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace (or detach, with `None`) the bearer token sent on every request.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self
            .auth_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register the recovery hook. Held weakly so the session owning this
    /// client can be dropped normally.
    pub fn set_recovery(&self, recovery: Weak<dyn SessionRecovery>) {
        *self.recovery.write().unwrap_or_else(PoisonError::into_inner) = Some(recovery);
    }

    pub fn clear_recovery(&self) {
        *self.recovery.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn recovery(&self) -> Option<Arc<dyn SessionRecovery>> {
        self.recovery
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<reqwest::Response, HearthError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url_for(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = self.auth_token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.send().await?)
    }

    /// Send a request and return the successful response.
    ///
    /// A 401 triggers one recovery attempt; if the session recovers the request
    /// is replayed once with the new token and that outcome is returned.
    /// Otherwise the original 401 is returned as [`HearthError::Api`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, HearthError> {
        let response = self.dispatch(request).await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let unauthorized = response.status() == StatusCode::UNAUTHORIZED;
        let original = error_from_response(response).await;
        if !unauthorized || request.skip_recovery {
            return Err(original);
        }
        let Some(recovery) = self.recovery() else {
            return Err(original);
        };

        debug!(method = %request.method, path = %request.path, "Unauthorized, attempting session recovery");
        if !recovery.attempt_recovery().await {
            warn!(method = %request.method, path = %request.path, "Session recovery declined");
            return Err(original);
        }

        debug!(method = %request.method, path = %request.path, "Session recovered, retrying request");
        let retried = self.dispatch(request).await?;
        if retried.status().is_success() {
            Ok(retried)
        } else {
            Err(error_from_response(retried).await)
        }
    }

    /// Send a request and decode the `data` field of the response envelope.
    pub async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, HearthError> {
        let response = self.execute(request).await?;
        let body = response.text().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            HearthError::InvalidResponse(format!(
                "{} {}: unexpected response body: {e}",
                request.method, request.path
            ))
        })?;
        Ok(envelope.data)
    }

    /// Send a request and return the whole JSON body (`Null` for empty bodies).
    pub async fn send_value(&self, request: &ApiRequest) -> Result<serde_json::Value, HearthError> {
        let response = self.execute(request).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HearthError> {
        self.send(&ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, HearthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, HearthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(&ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, HearthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(&ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, HearthError> {
        self.send(&ApiRequest::delete(path)).await
    }
}

async fn error_from_response(response: reqwest::Response) -> HearthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let mut message = error_message(&body);
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("request failed").to_string();
    }
    HearthError::api(status.as_u16(), message)
}
