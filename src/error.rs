//! Centralized error types for ticketdesk.
//!
//! This module provides a unified error hierarchy for the application with
//! user-friendly error messages. All error types use `thiserror` for
//! ergonomic error handling.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// The main application error type.
///
/// Aggregates every error the command-line front end can hit, keeping the
/// underlying error for logs while offering a plain message for the user.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (reading input, writing output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line input.
    #[error("{0}")]
    Usage(String),
}

impl AppError {
    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        AppError::Usage(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Set TICKETDESK_CONFIG to a file path."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check it is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
            },
            AppError::Api(e) => match e {
                ApiError::Network(_) => {
                    "Connection failed. Please check the server URL and your network.".to_string()
                }
                ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
                ApiError::Api { status, message } => {
                    format!("The server rejected the request ({}): {}", status, message)
                }
                ApiError::Login(msg) => format!("Login failed: {}", msg),
                ApiError::Decode(_) => {
                    "Unexpected response from the server. Please try again.".to_string()
                }
                ApiError::InvalidUrl(msg) => format!("Invalid server URL: {}", msg),
                ApiError::Serialize(_) => "Could not encode the request. Internal error.".to_string(),
                ApiError::InvalidHeader(_) => {
                    "The stored session is corrupt. Please log in again.".to_string()
                }
                ApiError::Storage(_) => {
                    "Could not access session storage. Please log in again.".to_string()
                }
            },
            AppError::Io(_) => "A file or terminal operation failed.".to_string(),
            AppError::Usage(msg) => msg.clone(),
        }
    }

    /// Check if this error means the user has to log in before continuing.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::Unauthorized)
                | AppError::Api(ApiError::InvalidHeader(_))
                | AppError::Api(ApiError::Login(_))
        )
    }

    /// Check if this error is critical, meaning nothing will work until the
    /// user fixes their setup.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Api(ApiError::InvalidUrl(_))
                | AppError::Api(ApiError::Storage(_))
        )
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Api(ApiError::Unauthorized) | AppError::Api(ApiError::InvalidHeader(_)) => {
                Some("Run 'ticketdesk login' to start a new session.")
            }
            AppError::Api(ApiError::Network(_)) | AppError::Api(ApiError::InvalidUrl(_)) => {
                Some("Check the profile's base_url in the configuration file.")
            }
            AppError::Config(ConfigError::ParseError(_))
            | AppError::Config(ConfigError::ValidationError(_)) => {
                Some("Fix the configuration file or remove it to start from defaults.")
            }
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_) => 2,
            e if e.requires_login() => 3,
            _ => 1,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
