//! Login and logout.
//!
//! Login bypasses the normal request path: there is no token yet, and a
//! rejected login must not be treated as an expired session.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::error::{ApiError, Result};
use super::gateway::Gateway;
use super::transport::Transport;
use super::types::TokenPair;

/// Path of the token issuance endpoint.
pub const TOKEN_PATH: &str = "/token/";

/// Body of the token request.
#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl<T: Transport> Gateway<T> {
    /// Exchange credentials for a token pair and store it.
    ///
    /// # Errors
    ///
    /// - `ApiError::Login` if the server rejects the credentials, with the
    ///   server's `detail` message when it sent one
    /// - `ApiError::Network` if no response was received
    /// - `ApiError::Decode` if a successful answer lacks the tokens
    /// - `ApiError::Storage` if the tokens cannot be persisted
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let body = serde_json::to_string(&Credentials { username, password })
            .map_err(|e| ApiError::Serialize(e.to_string()))?;

        let response = self
            .send_unauthenticated(TOKEN_PATH, Method::POST, Some(body))
            .await?;

        if !response.status.is_success() {
            let payload = serde_json::from_str::<Value>(&response.body).ok();
            let err = ApiError::login_from_payload(payload.as_ref());
            warn!(status = %response.status, "Login rejected: {}", err);
            return Err(err);
        }

        let tokens: TokenPair = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Decode(format!("unexpected token response: {}", e)))?;

        self.tokens().save(&tokens.access, &tokens.refresh)?;
        info!("Logged in");
        Ok(tokens)
    }

    /// Forget the session and go back to the login view.
    ///
    /// Never fails; storage problems are logged.
    pub fn logout(&self) {
        if let Err(e) = self.tokens().clear() {
            warn!("Failed to clear session on logout: {}", e);
        }
        debug!("Logged out");
        self.navigator().to_login();
    }
}
