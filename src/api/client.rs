//! Ticketdesk API client implementation.
//!
//! [`TicketClient`] exposes one method per REST operation. Each method is a
//! single call through the [`Gateway`], which owns authentication and error
//! classification.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::error::Result;
use super::gateway::{Gateway, RequestOptions};
use super::navigator::Navigator;
use super::transport::{ReqwestTransport, Transport};
use super::types::{
    Comment, Listing, NewComment, NewTicket, Ticket, TicketFilters, TicketUpdate, TokenPair, User,
    UserProfile,
};
use crate::config::{Profile, Settings};
use crate::session::TokenStore;

/// The ticketdesk API client.
#[derive(Debug)]
pub struct TicketClient<T = ReqwestTransport> {
    gateway: Gateway<T>,
}

impl TicketClient<ReqwestTransport> {
    /// Create a client for a profile, using the token storage and optional
    /// timeout from the settings.
    ///
    /// Does not contact the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the profile URL
    /// is invalid.
    #[instrument(skip_all, fields(profile_name = %profile.name))]
    pub fn from_profile(
        profile: &Profile,
        settings: &Settings,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(settings.timeout_secs.map(Duration::from_secs))?;
        let tokens = TokenStore::new(settings.token_storage.open(&profile.name)?);
        let gateway = Gateway::new(transport, &profile.base_url, tokens, navigator)?;

        info!(base_url = %gateway.base_url(), "Ticketdesk client created");
        Ok(Self { gateway })
    }
}

impl<T: Transport> TicketClient<T> {
    /// Wrap an existing gateway.
    pub fn with_gateway(gateway: Gateway<T>) -> Self {
        Self { gateway }
    }

    /// The underlying gateway, for requests this client has no method for.
    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// The session token store.
    pub fn tokens(&self) -> &TokenStore {
        self.gateway.tokens()
    }

    /// Whether an access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.gateway.tokens().is_authenticated()
    }

    /// Log in and store the issued tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        self.gateway.login(username, password).await
    }

    /// Clear the session and go to the login view.
    pub fn logout(&self) {
        self.gateway.logout()
    }

    /// List tickets, optionally filtered.
    ///
    /// Calls `GET /tickets/?<filters>`.
    #[instrument(skip(self))]
    pub async fn get_tickets(&self, filters: &TicketFilters) -> Result<Listing<Ticket>> {
        let options = RequestOptions::default().query_pairs(filters.to_query());
        let tickets: Listing<Ticket> = self.gateway.request_json("/tickets/", options).await?;
        debug!("Fetched {} tickets", tickets.items().len());
        Ok(tickets)
    }

    /// Tickets created by the current user.
    ///
    /// Calls `GET /tickets/my-tickets/`.
    #[instrument(skip(self))]
    pub async fn get_my_tickets(&self) -> Result<Listing<Ticket>> {
        self.gateway
            .request_json("/tickets/my-tickets/", RequestOptions::default())
            .await
    }

    /// Tickets assigned to the current user.
    ///
    /// Calls `GET /tickets/assigned-to-me/`.
    #[instrument(skip(self))]
    pub async fn get_assigned_tickets(&self) -> Result<Listing<Ticket>> {
        self.gateway
            .request_json("/tickets/assigned-to-me/", RequestOptions::default())
            .await
    }

    /// Fetch one ticket.
    ///
    /// Calls `GET /tickets/{id}/`.
    #[instrument(skip(self))]
    pub async fn get_ticket(&self, id: u64) -> Result<Ticket> {
        self.gateway
            .request_json(&format!("/tickets/{}/", id), RequestOptions::default())
            .await
    }

    /// Create a ticket.
    ///
    /// Calls `POST /tickets/`. The creation endpoint answers with its own
    /// representation rather than a full ticket, so the raw value is returned.
    #[instrument(skip(self, ticket), fields(title = %ticket.title))]
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Value> {
        let options = RequestOptions::new(Method::POST).json(ticket)?;
        let created = self.gateway.request("/tickets/", options).await?;
        info!("Ticket created");
        Ok(created)
    }

    /// Partially update a ticket.
    ///
    /// Calls `PATCH /tickets/{id}/`.
    #[instrument(skip(self, update))]
    pub async fn update_ticket(&self, id: u64, update: &TicketUpdate) -> Result<Ticket> {
        let options = RequestOptions::new(Method::PATCH).json(update)?;
        self.gateway
            .request_json(&format!("/tickets/{}/", id), options)
            .await
    }

    /// Close a ticket.
    ///
    /// Calls `POST /tickets/{id}/close/`. Closing an already closed ticket is
    /// rejected by the server with 400.
    #[instrument(skip(self))]
    pub async fn close_ticket(&self, id: u64) -> Result<Ticket> {
        self.gateway
            .request_json(
                &format!("/tickets/{}/close/", id),
                RequestOptions::new(Method::POST),
            )
            .await
    }

    /// Reopen a closed ticket.
    ///
    /// Calls `POST /tickets/{id}/reopen/`. Only staff may reopen; others get 403.
    #[instrument(skip(self))]
    pub async fn reopen_ticket(&self, id: u64) -> Result<Ticket> {
        self.gateway
            .request_json(
                &format!("/tickets/{}/reopen/", id),
                RequestOptions::new(Method::POST),
            )
            .await
    }

    /// Comments on a ticket.
    ///
    /// Calls `GET /comments/?ticket={id}`.
    #[instrument(skip(self))]
    pub async fn get_comments(&self, ticket_id: u64) -> Result<Listing<Comment>> {
        let options = RequestOptions::default().query("ticket", ticket_id.to_string());
        self.gateway.request_json("/comments/", options).await
    }

    /// Fetch one comment.
    ///
    /// Calls `GET /comments/{id}/`.
    #[instrument(skip(self))]
    pub async fn get_comment(&self, id: u64) -> Result<Comment> {
        self.gateway
            .request_json(&format!("/comments/{}/", id), RequestOptions::default())
            .await
    }

    /// Add a comment.
    ///
    /// Calls `POST /comments/`.
    #[instrument(skip(self, comment), fields(ticket = comment.ticket))]
    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let options = RequestOptions::new(Method::POST).json(comment)?;
        self.gateway.request_json("/comments/", options).await
    }

    /// Delete a comment. Only its author or staff may do this.
    ///
    /// Calls `DELETE /comments/{id}/`.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, id: u64) -> Result<()> {
        self.gateway
            .request(
                &format!("/comments/{}/", id),
                RequestOptions::new(Method::DELETE),
            )
            .await?;
        Ok(())
    }

    /// The current user's profile.
    ///
    /// Calls `GET /profiles/me/`.
    #[instrument(skip(self))]
    pub async fn get_my_profile(&self) -> Result<UserProfile> {
        self.gateway
            .request_json("/profiles/me/", RequestOptions::default())
            .await
    }

    /// All users.
    ///
    /// Calls `GET /users/`.
    #[instrument(skip(self))]
    pub async fn get_users(&self) -> Result<Listing<User>> {
        self.gateway
            .request_json("/users/", RequestOptions::default())
            .await
    }

    /// One user.
    ///
    /// Calls `GET /users/{id}/`.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: u64) -> Result<User> {
        self.gateway
            .request_json(&format!("/users/{}/", id), RequestOptions::default())
            .await
    }
}
