//! In-process transport for unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde_json::Value;

use super::error::{ApiError, Result};
use super::transport::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: StatusCode, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub fn push_json(&self, status: StatusCode, body: Value) {
        self.push(status, &body.to_string());
    }

    /// Queue a transport failure (no response received).
    pub fn push_network_error(&self) {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Network(err)));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        self.requests.lock().unwrap().push(request);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no response queued");
        async move { next }
    }
}
