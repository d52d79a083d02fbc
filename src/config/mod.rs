//! Configuration management for ticketdesk.
//!
//! This module handles loading, saving, and managing user configuration
//! including server profiles and application settings.
//!
//! The configuration lives in `<config dir>/ticketdesk/config.toml`, or at the
//! path named by `TICKETDESK_CONFIG`.

mod profile;
mod settings;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::{Profile, DEFAULT_BASE_URL};
pub use settings::Settings;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TICKETDESK_CONFIG";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no configuration directory.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// The configuration directory could not be created.
    #[error("failed to create configuration directory: {0}")]
    CreateDirError(#[source] io::Error),

    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[source] io::Error),

    /// The configuration file could not be written.
    #[error("failed to write configuration file: {0}")]
    WriteError(#[source] io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value failed validation.
    #[error("{0}")]
    ValidationError(String),

    /// No profile with the requested name exists.
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The full configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Application settings.
    #[serde(default)]
    pub settings: Settings,
    /// Configured server profiles.
    #[serde(default = "default_profiles")]
    pub profiles: Vec<Profile>,
}

fn default_profiles() -> Vec<Profile> {
    vec![Profile::default()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            profiles: default_profiles(),
        }
    }
}

impl Config {
    /// Path of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if neither the override nor a
    /// platform configuration directory is available.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        dirs::config_dir()
            .map(|dir| dir.join("ticketdesk").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load and validate the configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::ReadError(e)),
        };

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), profiles = config.profiles.len(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Validate and write the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(ConfigError::WriteError)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate every profile and the default profile reference.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(name) = &self.settings.default_profile {
            if self.profile(name).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' does not exist",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Pick the profile to use.
    ///
    /// An explicit name wins, then the configured default, then the first
    /// profile.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ProfileNotFound` if the requested profile does
    /// not exist or no profiles are configured.
    pub fn resolve_profile(&self, requested: Option<&str>) -> Result<&Profile> {
        match requested.or(self.settings.default_profile.as_deref()) {
            Some(name) => self
                .profile(name)
                .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string())),
            None => self
                .profiles
                .first()
                .ok_or_else(|| ConfigError::ProfileNotFound("<none configured>".to_string())),
        }
    }

    /// Add a profile, or replace the one with the same name.
    pub fn upsert_profile(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }
}
