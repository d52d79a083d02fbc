//! API error types for the ticketdesk client.

use reqwest::StatusCode;
use thiserror::Error;

/// Message used when a failed login carries no readable `detail`.
pub const GENERIC_LOGIN_ERROR: &str = "Login failed";

/// Errors that can occur when talking to the ticketdesk API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, timeout...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered 401. The stored session has already been cleared.
    #[error("Unauthorized: the session is no longer valid")]
    Unauthorized,

    /// Any other non-2xx answer, carrying the serialized error payload.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// The HTTP status returned by the server.
        status: StatusCode,
        /// The decoded error payload, serialized back to JSON.
        message: String,
    },

    /// The token endpoint rejected the credentials.
    #[error("Login failed: {0}")]
    Login(String),

    /// A response body was present but could not be decoded.
    #[error("Invalid API response: {0}")]
    Decode(String),

    /// The configured base URL or a request path is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A request body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Serialize(String),

    /// A caller-supplied header could not be used.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The token storage backend failed.
    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build the error for a non-2xx, non-401 answer from its decoded body.
    pub fn from_payload(status: StatusCode, payload: &serde_json::Value) -> Self {
        ApiError::Api {
            status,
            message: payload.to_string(),
        }
    }

    /// Build a login error from the token endpoint's error body.
    ///
    /// Uses the `detail` field when it is a string, otherwise a generic message.
    pub fn login_from_payload(payload: Option<&serde_json::Value>) -> Self {
        let detail = payload
            .and_then(|p| p.get("detail"))
            .and_then(|d| d.as_str())
            .filter(|d| !d.is_empty());

        ApiError::Login(detail.unwrap_or(GENERIC_LOGIN_ERROR).to_string())
    }

    /// The HTTP status carried by this error, when there is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
