//! ticketdesk - client library for the ticketdesk REST API
//!
//! Wraps the ticketing service's HTTP API: JWT login, a session token store,
//! a request gateway that attaches the bearer token and ends the session on
//! 401, and typed calls for tickets, comments, profiles, and users.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use api::{ApiError, Gateway, RequestOptions, TicketClient};
pub use session::TokenStore;
