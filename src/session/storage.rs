//! Durable key/value backends for session tokens.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, trace};

use crate::api::error::{ApiError, Result};

/// A string key/value store that outlives a single request.
///
/// Implementations must be safe to share between concurrently running
/// requests; each operation is atomic on its own.
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Store several entries at once.
    ///
    /// Backends that can write all entries in one step override this so a
    /// failure leaves none of them changed. The default sets them one by one.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Process-local storage. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ApiError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Storage("memory storage lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Storage("memory storage lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Storage("memory storage lock poisoned".to_string()))?;
        for (key, value) in new_entries {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Storage backed by a small JSON object on disk.
///
/// The file is re-read on every access so that separate invocations of the
/// command-line tool see each other's logins. Writes go through a temporary
/// file and a rename. On Unix the file is only readable by its owner.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create a file-backed store. The file is created lazily on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default session file for a profile, under the local data directory.
    ///
    /// Returns `None` if the platform has no local data directory.
    pub fn default_path(profile_name: &str) -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| {
            dir.join("ticketdesk")
                .join("sessions")
                .join(format!("{}.json", profile_name))
        })
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ApiError::Storage(format!(
                    "session file {} is corrupt: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ApiError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::Storage(format!("failed to serialize session: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, &contents)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                ApiError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })?;

        trace!(path = %self.path.display(), "Session file written");
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ApiError::Storage("file storage lock poisoned".to_string()))?;

        let mut entries = self.load()?;
        f(&mut entries);

        if entries.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Session file removed");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(ApiError::Storage(format!(
                    "failed to remove {}: {}",
                    self.path.display(),
                    e
                ))),
            }
        } else {
            self.persist(&entries)
        }
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn set_many(&self, new_entries: &[(&str, &str)]) -> Result<()> {
        self.update(|entries| {
            for (key, value) in new_entries {
                entries.insert(key.to_string(), value.to_string());
            }
        })
    }
}

/// Write `contents` to a file only the current user can read.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies when the file is created
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}
