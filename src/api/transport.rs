//! HTTP transport abstraction.
//!
//! The gateway never talks to `reqwest` directly; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and classifies the [`HttpResponse`] it
//! gets back. Dropping the returned future abandons the request.

use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use tracing::trace;

use super::error::{ApiError, Result};

/// An outgoing request with all headers already merged.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL.
    pub url: String,
    /// Final request headers.
    pub headers: HeaderMap,
    /// Raw body, already serialized by the caller.
    pub body: Option<String>,
}

/// A received response with its body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status.
    pub status: StatusCode,
    /// The raw response body.
    pub body: String,
}

impl HttpResponse {
    /// Create a response from a status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests over the network.
///
/// Implementations report transport-level failures (nothing received) as
/// `ApiError::Network`; any response, whatever its status, is `Ok`.
pub trait Transport: Send + Sync {
    /// Send a request and wait for the complete response.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// The default transport, backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport.
    ///
    /// Without a timeout a request waits until the server answers or the
    /// connection fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("ticketdesk/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Network)?;

        Ok(Self::with_client(client))
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        async move {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            trace!(%status, bytes = body.len(), "Response received");
            Ok(HttpResponse { status, body })
        }
    }
}
