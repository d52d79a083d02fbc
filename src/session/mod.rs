//! Session token storage.
//!
//! The [`TokenStore`] owns the access and refresh tokens of one session. It is
//! the only component that reads or writes the underlying storage; the request
//! gateway and the login flow go through it.

mod keychain;
mod storage;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::error::{ApiError, Result};

pub use keychain::KeyringStorage;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Where session tokens are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A JSON file per profile under the local data directory.
    #[default]
    File,
    /// The OS keyring.
    Keyring,
    /// Process memory only; every run starts logged out.
    Memory,
}

impl StorageBackend {
    /// Open the backend for a profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if the platform has no data directory for
    /// file storage.
    pub fn open(&self, profile_name: &str) -> Result<Arc<dyn SessionStorage>> {
        match self {
            StorageBackend::File => {
                let path = FileStorage::default_path(profile_name).ok_or_else(|| {
                    ApiError::Storage("could not determine local data directory".to_string())
                })?;
                debug!(path = %path.display(), "Using file session storage");
                Ok(Arc::new(FileStorage::new(path)))
            }
            StorageBackend::Keyring => Ok(Arc::new(KeyringStorage::new(profile_name))),
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        }
    }
}

/// A point-in-time view of the stored tokens.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// The bearer token sent with every resource request.
    pub access_token: Option<String>,
    /// The refresh token issued at login. Stored but never used.
    pub refresh_token: Option<String>,
}

impl Session {
    /// Whether this session can authenticate requests.
    ///
    /// Only the access token counts; a lone refresh token is not enough.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Access/refresh token store over a [`SessionStorage`] backend.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
}

impl TokenStore {
    /// Create a store over the given backend.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Create a store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// The current access token, if any.
    ///
    /// Backend failures are logged and reported as absence.
    pub fn get_access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// The current refresh token, if any.
    pub fn get_refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Overwrite both tokens in one backend write.
    ///
    /// Values are stored as given; an empty access token still counts as a
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if the backend cannot persist the tokens.
    pub fn save(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, access_token),
            (REFRESH_TOKEN_KEY, refresh_token),
        ])?;
        debug!("Session tokens saved");
        Ok(())
    }

    /// Remove both tokens.
    ///
    /// Both removals are attempted even if the first one fails.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure.
    pub fn clear(&self) -> Result<()> {
        let access = self.storage.remove(ACCESS_TOKEN_KEY);
        let refresh = self.storage.remove(REFRESH_TOKEN_KEY);
        debug!("Session tokens cleared");
        access.and(refresh)
    }

    /// Whether an access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.get_access_token().is_some()
    }

    /// Snapshot both tokens.
    pub fn session(&self) -> Session {
        Session {
            access_token: self.get_access_token(),
            refresh_token: self.get_refresh_token(),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, "Failed to read session token: {}", e);
                None
            }
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
