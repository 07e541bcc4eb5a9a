#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hearth::auth::{AuthError, CookieOptions, MemoryStorage, SessionStorage};
use hearth::client::ApiClient;
use serde_json::{json, Value};
use wiremock::MockServer;

pub fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.test-signature")
}

/// Access token for a marketplace user; `generation` keeps rotated tokens distinct.
pub fn access_token(user_id: &str, generation: u32) -> String {
    jwt(json!({
        "id": user_id,
        "name": "Dana Ruiz",
        "email": "dana@example.com",
        "role": "customer",
        "avatar": "https://cdn.example.com/dana.png",
        "gen": generation,
        "exp": 4_102_444_800i64
    }))
}

pub fn client_for(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::with_http_client(reqwest::Client::new(), &server.uri()))
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

impl SessionStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, AuthError> {
        Err(AuthError::Io("disk unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &str, _options: &CookieOptions) -> Result<(), AuthError> {
        Err(AuthError::Io("disk unavailable".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), AuthError> {
        Err(AuthError::Io("disk unavailable".to_string()))
    }
}

/// In-memory storage whose writes take `delay` each.
pub struct SlowStorage {
    inner: MemoryStorage,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay,
        }
    }
}

impl SessionStorage for SlowStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), AuthError> {
        std::thread::sleep(self.delay);
        self.inner.set(key, value, options)
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.inner.remove(key)
    }
}
