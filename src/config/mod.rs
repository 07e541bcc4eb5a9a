//! Configuration system (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::HearthError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 30;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Client configuration for the marketplace backend.
///
/// # Example
/// ```
/// use hearth::config::HearthConfig;
///
/// let config = HearthConfig::new("https://api.example.com/v1")
///     .with_timeout(std::time::Duration::from_secs(5));
/// assert_eq!(config.base_url, "https://api.example.com/v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HearthConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub storage_dir: PathBuf,
    /// Refresh this long before the access token's `exp`.
    pub refresh_skew: Duration,
    pub refresh_path: String,
    pub login_path: String,
}

impl Default for HearthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl HearthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_dir: default_storage_dir(),
            refresh_skew: Duration::from_secs(DEFAULT_REFRESH_SKEW_SECS),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    /// Load from environment variables (HEARTH_API_URL, HEARTH_TIMEOUT_SECS, ...).
    ///
    /// A `.env` file in the working directory is honored.
    pub fn from_env() -> Result<Self, HearthError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HearthError> {
        let mut config = match lookup("HEARTH_API_URL") {
            Some(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        };

        if let Some(raw) = lookup("HEARTH_TIMEOUT_SECS") {
            let secs = parse_secs("HEARTH_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(HearthError::Configuration(
                    "HEARTH_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("HEARTH_REFRESH_SKEW_SECS") {
            config.refresh_skew = Duration::from_secs(parse_secs("HEARTH_REFRESH_SKEW_SECS", &raw)?);
        }
        if let Some(dir) = lookup("HEARTH_STORAGE_DIR").filter(|d| !d.trim().is_empty()) {
            config.storage_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

/// Default directory for persisted session state (`~/.hearth`).
pub fn default_storage_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".hearth"))
        .unwrap_or_else(|| PathBuf::from(".hearth"))
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, HearthError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| HearthError::Configuration(format!("{var} is not a whole number of seconds: {e}")))
}
