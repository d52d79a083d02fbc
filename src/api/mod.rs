//! Ticketdesk API client and types.
//!
//! This module provides the interface for communicating with the ticketdesk
//! REST API: the request gateway, login/logout, and typed resource calls.

mod auth;
mod client;
pub mod error;
mod gateway;
mod navigator;
mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::TOKEN_PATH;
pub use client::TicketClient;
pub use error::ApiError;
pub use gateway::{encode_query, Gateway, RequestOptions};
pub use navigator::{Navigator, RecordingNavigator};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
