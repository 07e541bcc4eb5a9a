use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

pub const AUTH_TOKEN_KEY: &str = "auth-token";
pub const REFRESH_TOKEN_KEY: &str = "refresh-token";
pub const USER_ID_KEY: &str = "userId";

/// Every key the session writes.
pub const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY];

/// Cookie-style attributes attached to each persisted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub path: String,
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: Duration::days(7),
            path: "/".to_string(),
            http_only: false,
        }
    }
}

/// Durable key/value storage for session entries.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub path: String,
    pub http_only: bool,
}

impl StoredEntry {
    fn new(value: &str, options: &CookieOptions) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + options.max_age,
            path: options.path.clone(),
            http_only: options.http_only,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry including attributes, expired or not.
    pub fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredEntry>>, AuthError> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Io("session storage lock poisoned".into()))
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), AuthError> {
        self.lock()?
            .insert(key.to_string(), StoredEntry::new(value, options));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// File-backed storage: one TOML file holding every entry.
///
/// # Example
/// ```no_run
/// use hearth::auth::{CookieOptions, FileStorage, SessionStorage};
///
/// let storage = FileStorage::new_default();
/// storage.set("auth-token", "eyJhbGciOi...", &CookieOptions::default())?;
/// # Ok::<(), hearth::auth::AuthError>(())
/// ```
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: base_dir.into().join("session.toml"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn new_default() -> Self {
        Self::new(crate::config::default_storage_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<StorageFile, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageFile::default())
            }
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        Ok(toml::from_str(&raw)?)
    }

    fn write_file(&self, file: &StorageFile) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string(file)?;
        fs::write(&self.path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut StorageFile)) -> Result<(), AuthError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AuthError::Io("session storage lock poisoned".into()))?;
        let mut file = self.read_file()?;
        let now = Utc::now();
        file.entries.retain(|_, entry| entry.is_live(now));
        apply(&mut file);
        if file.entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(AuthError::Io(err.to_string())),
            };
        }
        self.write_file(&file)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let file = self.read_file()?;
        let now = Utc::now();
        Ok(file
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    fn set(&self, key: &str, value: &str, options: &CookieOptions) -> Result<(), AuthError> {
        self.update(|file| {
            file.entries
                .insert(key.to_string(), StoredEntry::new(value, options));
        })
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.update(|file| {
            file.entries.remove(key);
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    entries: BTreeMap<String, StoredEntry>,
}

impl Default for StorageFile {
    fn default() -> Self {
        Self {
            version: 1,
            entries: BTreeMap::new(),
        }
    }
}
