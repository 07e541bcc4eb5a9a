//! Client-side session lifecycle.
//!
//! A [`Session`] owns the credential pair and the identity decoded from it,
//! persists both through a [`SessionStorage`], and keeps the [`ApiClient`]'s
//! bearer token in sync. It also acts as the client's [`SessionRecovery`]:
//! a 401 anywhere leads to [`Session::refresh_access_token`].
//!
//! States are Authenticated (credential and identity present) and
//! Unauthenticated (both absent). Public operations never return errors for
//! session problems; they are expressed as a transition to Unauthenticated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::claims::{decode_identity, Identity};
use super::credential::CredentialPair;
use super::error::AuthError;
use super::storage::{
    CookieOptions, FileStorage, SessionStorage, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS,
    USER_ID_KEY,
};
use crate::client::{ApiClient, ApiRequest, SessionRecovery};
use crate::config::{HearthConfig, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_SKEW_SECS};
use crate::error::HearthError;

/// Settled snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub credential: Option<CredentialPair>,
    pub identity: Option<Identity>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// Endpoint paths and persistence attributes used by a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub cookie: CookieOptions,
    pub refresh_path: String,
    pub login_path: String,
    pub refresh_skew: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cookie: CookieOptions::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_skew: Duration::from_secs(DEFAULT_REFRESH_SKEW_SECS),
        }
    }
}

impl From<&HearthConfig> for SessionOptions {
    fn from(config: &HearthConfig) -> Self {
        Self {
            cookie: CookieOptions::default(),
            refresh_path: config.refresh_path.clone(),
            login_path: config.login_path.clone(),
            refresh_skew: config.refresh_skew,
        }
    }
}

/// Credential holder wired to an [`ApiClient`].
///
/// # Example
/// ```no_run
/// use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
/// use hearth::auth::{MemoryStorage, Session};
/// use hearth::client::ApiClient;
/// use hearth::config::HearthConfig;
///
/// # async fn example() -> hearth::error::Result<()> {
/// let client = Arc::new(ApiClient::new(&HearthConfig::new("https://api.example.com"))?);
/// let session = Session::new(client.clone(), Arc::new(MemoryStorage::new()));
/// session.login("dana@example.com", "hunter2").await?;
/// let bookings: serde_json::Value = client.get("/bookings/mine").await?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    client: Arc<ApiClient>,
    storage: Arc<dyn SessionStorage>,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    refresh_gate: Mutex<()>,
    /// Held across every write to storage, the client token, and state.
    write_lock: SyncMutex<()>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .field("options", &self.options)
            .finish()
    }
}

impl Session {
    /// Create a session, register it as the client's recovery hook, and
    /// hydrate it from storage.
    pub fn new(client: Arc<ApiClient>, storage: Arc<dyn SessionStorage>) -> Arc<Self> {
        Self::with_options(client, storage, SessionOptions::default())
    }

    pub fn with_options(
        client: Arc<ApiClient>,
        storage: Arc<dyn SessionStorage>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let session = Arc::new(Self {
            client,
            storage,
            options,
            state,
            refresh_gate: Mutex::new(()),
            write_lock: SyncMutex::new(()),
            in_flight: AtomicUsize::new(0),
        });
        let recovery: Arc<dyn SessionRecovery> = session.clone();
        session.client.set_recovery(Arc::downgrade(&recovery));
        session.hydrate();
        session
    }

    /// Build a client and file-backed session from configuration.
    pub fn from_config(config: &HearthConfig) -> Result<Arc<Self>, HearthError> {
        let client = Arc::new(ApiClient::new(config)?);
        let storage = Arc::new(FileStorage::new(config.storage_dir.clone()));
        Ok(Self::with_options(client, storage, SessionOptions::from(config)))
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every settled state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .borrow()
            .credential
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .borrow()
            .credential
            .as_ref()
            .map(|c| c.refresh_token.clone())
    }

    fn hydrate(&self) {
        let access = self.read_entry(AUTH_TOKEN_KEY);
        let refresh = self.read_entry(REFRESH_TOKEN_KEY);
        if access.is_none() && refresh.is_none() {
            debug!("No persisted session");
            return;
        }
        if self.set_token(access.as_deref(), refresh.as_deref()) {
            debug!("Restored persisted session");
        }
    }

    /// Install a credential pair.
    ///
    /// Returns `true` when the session is now authenticated. A missing half or
    /// an access token without a usable identity logs the session out instead.
    pub fn set_token(&self, access_token: Option<&str>, refresh_token: Option<&str>) -> bool {
        let _write = self.lock_writes();
        self.install(access_token, refresh_token)
    }

    /// Caller holds the write lock.
    fn install(&self, access_token: Option<&str>, refresh_token: Option<&str>) -> bool {
        let Some(credential) = CredentialPair::from_parts(access_token, refresh_token) else {
            debug!("Incomplete credential pair, clearing session");
            self.clear();
            return false;
        };
        let Some(identity) = decode_identity(&credential.access_token) else {
            self.clear();
            return false;
        };

        self.persist(&credential, &identity);
        self.client
            .set_auth_token(Some(credential.access_token.clone()));
        info!(user_id = %identity.id, role = %identity.role, "Session established");
        self.state.send_modify(|state| {
            state.credential = Some(credential);
            state.identity = Some(identity);
            state.is_authenticated = true;
        });
        true
    }

    /// Clear memory, storage, and the client's token. Idempotent.
    pub fn logout(&self) {
        let _write = self.lock_writes();
        self.clear();
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller holds the write lock.
    fn clear(&self) {
        let was_active = self.state.send_if_modified(|state| {
            let active = state.is_authenticated || state.credential.is_some();
            state.credential = None;
            state.identity = None;
            state.is_authenticated = false;
            active
        });
        for key in SESSION_KEYS {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "Failed to clear persisted session entry");
            }
        }
        self.client.set_auth_token(None);
        if was_active {
            info!("Session cleared");
        }
    }

    /// Exchange the refresh token for a new credential pair.
    ///
    /// Resolves `false` (and logs out) when there is no refresh token or the
    /// exchange fails for any reason. Calls are serialized; a caller that
    /// waited while another caller rotated the pair reuses that outcome.
    pub async fn refresh_access_token(&self) -> bool {
        let observed = self.refresh_token();
        let _gate = self.refresh_gate.lock().await;

        let Some(refresh_token) = self.refresh_token() else {
            debug!("No refresh token, session cannot be recovered");
            self.logout();
            return false;
        };
        if observed.as_deref() != Some(refresh_token.as_str()) {
            debug!("Credential rotated while waiting, skipping refresh");
            return self.is_authenticated();
        }

        let result = {
            let _loading = self.begin_loading();
            self.request_refresh(&refresh_token).await
        };

        let _write = self.lock_writes();
        if self.refresh_token().as_deref() != Some(refresh_token.as_str()) {
            debug!("Session changed during refresh, discarding result");
            return self.is_authenticated();
        }

        match result {
            Ok(pair) => {
                let refreshed = self.install(Some(&pair.access_token), Some(&pair.refresh_token));
                if refreshed {
                    debug!("Access token refreshed");
                }
                refreshed
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, logging out");
                self.clear();
                false
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<CredentialPair, AuthError> {
        let request = ApiRequest::post(self.options.refresh_path.as_str())
            .json(&RefreshRequest { refresh_token })?
            .without_recovery();
        let payload: TokenPayload = self.client.send(&request).await?;
        let access = payload.access_token.as_deref();
        let refresh = payload.refresh_token.as_deref();
        if access.is_none() {
            return Err(AuthError::InvalidResponse("refresh response missing accessToken".into()));
        }
        CredentialPair::from_parts(access, refresh).ok_or_else(|| {
            AuthError::InvalidResponse("refresh response missing refreshToken".into())
        })
    }

    /// Sign in with email and password.
    ///
    /// Unlike the other operations this reports failures, since the caller
    /// has to show them. Rejected credentials leave the current state alone;
    /// a malformed success response leaves the session logged out.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let request = ApiRequest::post(self.options.login_path.as_str())
            .json(&LoginRequest { email, password })?
            .without_recovery();
        let body = {
            let _loading = self.begin_loading();
            self.client.send_value(&request).await?
        };
        let response: LoginResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::InvalidResponse(format!("login response: {e}")))?;

        let Some(access) = response.data.access_token else {
            self.logout();
            return Err(AuthError::InvalidResponse("login response missing accessToken".into()));
        };
        let Some(refresh) = response.data.refresh_token.or(response.refresh_token) else {
            self.logout();
            return Err(AuthError::InvalidResponse("login response missing refreshToken".into()));
        };
        if !self.set_token(Some(&access), Some(&refresh)) {
            return Err(AuthError::InvalidResponse(
                "login access token has no usable identity".into(),
            ));
        }
        self.identity().ok_or(AuthError::NotLoggedIn)
    }

    /// Refresh ahead of expiry when the access token's `exp` is near.
    ///
    /// Returns whether the session is authenticated afterwards.
    pub async fn ensure_fresh(&self) -> bool {
        let skew = chrono::Duration::from_std(self.options.refresh_skew)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let due = self
            .identity()
            .is_some_and(|identity| identity.expires_within(Utc::now(), skew));
        if due {
            debug!("Access token near expiry, refreshing");
            return self.refresh_access_token().await;
        }
        self.is_authenticated()
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "Failed to read persisted session entry");
                None
            }
        }
    }

    fn persist(&self, credential: &CredentialPair, identity: &Identity) {
        let entries = [
            (AUTH_TOKEN_KEY, credential.access_token.as_str()),
            (REFRESH_TOKEN_KEY, credential.refresh_token.as_str()),
            (USER_ID_KEY, identity.id.as_str()),
        ];
        for (key, value) in entries {
            if let Err(err) = self.storage.set(key, value, &self.options.cookie) {
                warn!(key, error = %err, "Failed to persist session entry");
            }
        }
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.sync_loading();
        LoadingGuard { session: self }
    }

    fn sync_loading(&self) {
        let loading = self.in_flight.load(Ordering::SeqCst) > 0;
        self.state.send_if_modified(|state| {
            let changed = state.is_loading != loading;
            state.is_loading = loading;
            changed
        });
    }
}

#[async_trait]
impl SessionRecovery for Session {
    async fn attempt_recovery(&self) -> bool {
        self.refresh_access_token().await
    }
}

/// Clears the loading flag when the last network call finishes or is dropped.
struct LoadingGuard<'a> {
    session: &'a Session,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.session.sync_loading();
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    data: TokenPayload,
    #[serde(default)]
    refresh_token: Option<String>,
}
