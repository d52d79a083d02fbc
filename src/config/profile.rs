//! Server profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// A ticketdesk server profile.
///
/// Profiles store connection details for one API deployment. Tokens are kept
/// separately by the session storage, keyed by profile name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The API root, e.g. "https://desk.example.com/api".
    pub base_url: String,

    /// Username suggested at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, base_url: String) -> Self {
        Self {
            name,
            base_url,
            username: None,
        }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The base URL is non-empty and uses http or https
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.base_url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': base URL cannot be empty",
                self.name
            )));
        }

        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': base URL must start with http:// or https://",
                self.name
            )));
        }

        Ok(())
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new("default".to_string(), DEFAULT_BASE_URL.to_string())
    }
}
