//! Application settings configuration.

use serde::{Deserialize, Serialize};

use crate::session::StorageBackend;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The name of the default profile to use.
    pub default_profile: Option<String>,
    /// HTTP request timeout in seconds. Unset means requests wait for the
    /// server indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Where session tokens are kept.
    pub token_storage: StorageBackend,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            timeout_secs: None,
            token_storage: StorageBackend::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings = toml::from_str(r#"token_storage = "keyring""#).unwrap();
        assert_eq!(settings.token_storage, StorageBackend::Keyring);
        assert_eq!(settings.timeout_secs, None);
        assert_eq!(settings.default_profile, None);
    }

    #[test]
    fn test_explicit_timeout() {
        let settings: Settings = toml::from_str("timeout_secs = 15").unwrap();
        assert_eq!(settings.timeout_secs, Some(15));
    }
}
