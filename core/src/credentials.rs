//! Sources for the bearer token attached to outgoing requests.
//!
//! The token is looked up before every attempt, so a token stored or
//! cleared between retries takes effect on the next attempt.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use tracing::warn;

/// Fixed key the token is persisted under.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// No credentials; requests go out without an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenStore for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// In-process token holder.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }
}

/// Token persisted in a JSON key/value file under [`AUTH_TOKEN_KEY`].
///
/// The file is re-read on every lookup. A missing or unreadable file means
/// no token.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist `token`, keeping any other keys already in the file.
    pub fn store(&self, token: &str) -> std::io::Result<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(AUTH_TOKEN_KEY);
        self.write_entries(&entries)
    }

    fn read_entries(&self) -> Option<BTreeMap<String, String>> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed token file");
                None
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, raw)
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.read_entries()?
            .remove(AUTH_TOKEN_KEY)
            .filter(|t| !t.is_empty())
    }
}
