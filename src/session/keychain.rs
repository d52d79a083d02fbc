//! Session storage in the OS keyring.
//!
//! Each entry is stored as a separate keyring item under the `ticketdesk`
//! service, keyed by `<profile>:<entry>`.

use super::storage::SessionStorage;
use crate::api::error::{ApiError, Result};

/// The keyring service name for ticketdesk tokens.
const KEYRING_SERVICE: &str = "ticketdesk";

/// Token storage in the platform keychain.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    profile_name: String,
}

impl KeyringStorage {
    /// Create keyring storage scoped to a profile.
    pub fn new(profile_name: &str) -> Self {
        Self {
            profile_name: profile_name.to_string(),
        }
    }

    fn account(&self, key: &str) -> String {
        keyring_account(&self.profile_name, key)
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account(key))
            .map_err(|e| ApiError::Storage(format!("failed to access keyring: {}", e)))
    }
}

/// Build the keyring account name for a profile entry.
fn keyring_account(profile_name: &str, key: &str) -> String {
    format!("{}:{}", profile_name, key)
}

impl SessionStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ApiError::Storage(format!("failed to retrieve token: {}", e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| ApiError::Storage(format!("failed to store token: {}", e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("failed to delete token: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyring_account_is_profile_scoped() {
        assert_eq!(keyring_account("work", "access_token"), "work:access_token");
        assert_ne!(
            keyring_account("work", "access_token"),
            keyring_account("home", "access_token")
        );
    }
}
