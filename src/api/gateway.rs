//! The request gateway.
//!
//! Every resource call goes through [`Gateway::request`], which attaches the
//! bearer token, sends the request, and turns the response into either a JSON
//! value or an [`ApiError`]. A 401 answer ends the session: the token store is
//! cleared and the navigator is sent to the login view before the error is
//! returned.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::error::{ApiError, Result};
use super::navigator::Navigator;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::session::TokenStore;

/// Caller-side description of a request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method. Defaults to GET.
    pub method: Method,
    /// Extra headers, merged over the defaults.
    pub headers: HeaderMap,
    /// Query parameters appended to the path.
    pub query: Vec<(String, String)>,
    /// Raw body, already serialized.
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    /// Options for the given method with no headers, query, or body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Add or replace a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a raw body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `payload` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Serialize` if the payload cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(self, payload: &B) -> Result<Self> {
        let body =
            serde_json::to_string(payload).map_err(|e| ApiError::Serialize(e.to_string()))?;
        Ok(self.body(body))
    }
}

/// Sends authenticated requests to the API and classifies the answers.
pub struct Gateway<T> {
    transport: T,
    base_url: String,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
}

impl<T: Transport> Gateway<T> {
    /// Create a gateway.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` is not an http(s) URL.
    pub fn new(
        transport: T,
        base_url: &str,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            transport,
            base_url,
            tokens,
            navigator,
        })
    }

    /// The normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token store this gateway reads from.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub(super) fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// Send a request and return the decoded JSON body.
    ///
    /// # Errors
    ///
    /// - `ApiError::Network` if no response was received
    /// - `ApiError::Unauthorized` on 401, after clearing the session
    /// - `ApiError::Api` on any other non-2xx status
    /// - `ApiError::Decode` if the body is not valid JSON
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value> {
        let url = self.url_for(path, &options.query)?;
        let headers = self.merge_headers(options.headers)?;

        debug!(url = %url, "Sending request");
        let response = self
            .transport
            .send(HttpRequest {
                method: options.method,
                url,
                headers,
                body: options.body,
            })
            .await?;

        self.classify(response)
    }

    /// Send a request and decode the body into `R`.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::request`]; a body that does not match `R` is
    /// `ApiError::Decode`.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R> {
        let value = self.request(path, options).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Decode(format!("unexpected response shape: {}", e)))
    }

    /// Send a request without touching the session.
    ///
    /// Used by the login flow, which runs before any token exists.
    pub(super) async fn send_unauthenticated(
        &self,
        path: &str,
        method: Method,
        body: Option<String>,
    ) -> Result<HttpResponse> {
        let url = self.url_for(path, &[])?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(url = %url, "Sending unauthenticated request");
        self.transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await
    }

    /// Build the absolute URL for a path and query.
    fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        if !path.starts_with('/') {
            return Err(ApiError::InvalidUrl(format!(
                "request path '{}' must start with '/'",
                path
            )));
        }

        let mut url = format!("{}{}", self.base_url, path);
        let encoded = encode_query(query);
        if !encoded.is_empty() {
            url.push(if path.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }
        Ok(url)
    }

    /// Defaults, then caller headers, then the bearer token.
    fn merge_headers(&self, caller: HeaderMap) -> Result<HeaderMap> {
        let mut headers = caller;
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = self.tokens.get_access_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ApiError::InvalidHeader("stored access token is not a valid header value".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    fn classify(&self, response: HttpResponse) -> Result<Value> {
        let status = response.status;

        if status == StatusCode::UNAUTHORIZED {
            warn!("Server rejected the session, returning to login");
            if let Err(e) = self.tokens.clear() {
                warn!("Failed to clear session after 401: {}", e);
            }
            self.navigator.to_login();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            debug!(%status, body = %response.body, "Error response");
            let payload: Value = serde_json::from_str(&response.body).map_err(|e| {
                ApiError::Decode(format!("HTTP {} with undecodable body: {}", status, e))
            })?;
            return Err(ApiError::from_payload(status, &payload));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Decode(format!("failed to parse response: {}", e)))
    }
}

impl<T> fmt::Debug for Gateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// Percent-encode query pairs into `k=v&k=v` form.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Trim trailing slashes and check the scheme.
fn normalize_base_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');

    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(ApiError::InvalidUrl(format!(
            "base URL '{}' must start with http:// or https://",
            url
        )));
    }

    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. Tokens will be sent in clear text.", url);
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::navigator::RecordingNavigator;
    use crate::api::testing::MockTransport;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const BASE: &str = "http://127.0.0.1:8000/api";

    fn gateway(
        transport: MockTransport,
        tokens: TokenStore,
    ) -> (Gateway<MockTransport>, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::new());
        let gw = Gateway::new(transport, BASE, tokens, nav.clone()).unwrap();
        (gw, nav)
    }

    #[test]
    fn test_normalize_base_url_removes_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://desk.example.com/api/").unwrap(),
            "https://desk.example.com/api"
        );
        assert_eq!(
            normalize_base_url("https://desk.example.com/api///").unwrap(),
            "https://desk.example.com/api"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_missing_scheme() {
        assert!(matches!(
            normalize_base_url("desk.example.com/api"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_encode_query() {
        let pairs = vec![
            ("status".to_string(), "open".to_string()),
            ("search".to_string(), "no wifi & dns".to_string()),
        ];
        assert_eq!(encode_query(&pairs), "status=open&search=no%20wifi%20%26%20dns");
        assert_eq!(encode_query(&[]), "");
    }

    #[test]
    fn test_request_options_json() {
        let options = RequestOptions::new(Method::POST)
            .json(&json!({"title": "Printer"}))
            .unwrap();
        assert_eq!(options.body.as_deref(), Some(r#"{"title":"Printer"}"#));
        assert_eq!(RequestOptions::default().method, Method::GET);
    }

    #[tokio::test]
    async fn test_request_builds_url_from_base_and_path() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!([]));
        let (gw, _) = gateway(transport.clone(), TokenStore::in_memory());

        assert_ok!(gw.request("/tickets/", RequestOptions::default()).await);

        let sent = transport.last_request();
        assert_eq!(sent.url, "http://127.0.0.1:8000/api/tickets/");
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_request_appends_query() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!([]));
        transport.push_json(StatusCode::OK, json!([]));
        let (gw, _) = gateway(transport.clone(), TokenStore::in_memory());

        let options = RequestOptions::default().query("status", "open");
        assert_ok!(gw.request("/tickets/", options).await);
        assert_eq!(
            transport.last_request().url,
            "http://127.0.0.1:8000/api/tickets/?status=open"
        );

        let options = RequestOptions::default().query("ordering", "-created_at");
        assert_ok!(gw.request("/comments/?ticket=4", options).await);
        assert_eq!(
            transport.last_request().url,
            "http://127.0.0.1:8000/api/comments/?ticket=4&ordering=-created_at"
        );
    }

    #[tokio::test]
    async fn test_request_rejects_relative_path() {
        let (gw, _) = gateway(MockTransport::new(), TokenStore::in_memory());
        let err = gw.request("tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_bearer_header_when_token_stored() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!({}));
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, _) = gateway(transport.clone(), tokens);

        assert_ok!(gw.request("/profiles/me/", RequestOptions::default()).await);
        assert_eq!(transport.last_request().headers[AUTHORIZATION], "Bearer A");
    }

    #[tokio::test]
    async fn test_no_auth_header_without_token() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!({}));
        let (gw, _) = gateway(transport.clone(), TokenStore::in_memory());

        assert_ok!(gw.request("/users/", RequestOptions::default()).await);
        assert!(!transport.last_request().headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_bearer_overrides_caller_authorization() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!({}));
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, _) = gateway(transport.clone(), tokens);

        let options = RequestOptions::default()
            .header(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_ok!(gw.request("/users/", options).await);

        let sent = transport.last_request();
        assert_eq!(sent.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(sent.headers[AUTHORIZATION], "Bearer A");
    }

    #[tokio::test]
    async fn test_caller_headers_kept_without_token() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!({}));
        let (gw, _) = gateway(transport.clone(), TokenStore::in_memory());

        let options = RequestOptions::default()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/merge-patch+json"))
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            );
        assert_ok!(gw.request("/users/", options).await);

        let sent = transport.last_request();
        assert_eq!(sent.headers[CONTENT_TYPE], "application/merge-patch+json");
        assert_eq!(sent.headers["x-request-id"], "abc");
    }

    #[tokio::test]
    async fn test_success_returns_decoded_body() {
        let transport = MockTransport::new();
        let body = json!({"id": 7, "title": "Printer on fire", "tags": [1, 2]});
        transport.push_json(StatusCode::OK, body.clone());
        let (gw, _) = gateway(transport, TokenStore::in_memory());

        let value = gw.request("/tickets/7/", RequestOptions::default()).await.unwrap();
        assert_eq!(value, body);
    }

    #[tokio::test]
    async fn test_success_with_empty_body_is_null() {
        let transport = MockTransport::new();
        transport.push(StatusCode::NO_CONTENT, "");
        let (gw, _) = gateway(transport, TokenStore::in_memory());

        let value = gw
            .request("/comments/3/", RequestOptions::new(Method::DELETE))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_success_with_invalid_json_is_decode_error() {
        let transport = MockTransport::new();
        transport.push(StatusCode::OK, "<html>oops</html>");
        let (gw, _) = gateway(transport, TokenStore::in_memory());

        let err = gw.request("/tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_navigates() {
        let transport = MockTransport::new();
        transport.push(StatusCode::UNAUTHORIZED, "this is not even json");
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, nav) = gateway(transport, tokens.clone());

        let err = gw.request("/tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::Unauthorized)));
        assert!(!tokens.is_authenticated());
        assert_eq!(tokens.get_refresh_token(), None);
        assert_eq!(nav.visits(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_with_json_body_still_unauthorized() {
        let transport = MockTransport::new();
        transport.push_json(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Given token not valid for any token type"}),
        );
        let (gw, nav) = gateway(transport, TokenStore::in_memory());

        let err = gw.request("/tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::Unauthorized)));
        assert!(nav.login_requested());
    }

    #[tokio::test]
    async fn test_error_status_carries_payload() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::BAD_REQUEST, json!({"field": "required"}));
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, nav) = gateway(transport, tokens.clone());

        let err = assert_err!(gw.request("/tickets/", RequestOptions::new(Method::POST)).await);
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(message.contains(r#"{"field":"required"}"#));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
        assert!(tokens.is_authenticated());
        assert!(!nav.login_requested());
    }

    #[tokio::test]
    async fn test_error_status_with_invalid_body_is_decode_error() {
        let transport = MockTransport::new();
        transport.push(StatusCode::BAD_GATEWAY, "Bad Gateway");
        let (gw, _) = gateway(transport, TokenStore::in_memory());

        let err = gw.request("/tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let transport = MockTransport::new();
        transport.push_network_error();
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, nav) = gateway(transport, tokens.clone());

        let err = gw.request("/tickets/", RequestOptions::default()).await;
        assert!(matches!(err, Err(ApiError::Network(_))));
        assert!(tokens.is_authenticated());
        assert!(!nav.login_requested());
    }

    #[tokio::test]
    async fn test_request_json_shape_mismatch_is_decode_error() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!({"not": "a list"}));
        let (gw, _) = gateway(transport, TokenStore::in_memory());

        let err = gw
            .request_json::<Vec<u32>>("/users/", RequestOptions::default())
            .await;
        assert!(matches!(err, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_token() {
        let transport = MockTransport::new();
        transport.push_json(StatusCode::OK, json!(1));
        transport.push_json(StatusCode::OK, json!(2));
        let tokens = TokenStore::in_memory();
        tokens.save("A", "R").unwrap();
        let (gw, _) = gateway(transport.clone(), tokens);

        let (a, b) = tokio::join!(
            gw.request("/tickets/my-tickets/", RequestOptions::default()),
            gw.request("/tickets/assigned-to-me/", RequestOptions::default()),
        );
        assert_ok!(a);
        assert_ok!(b);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.headers[AUTHORIZATION] == "Bearer A"));
    }
}
