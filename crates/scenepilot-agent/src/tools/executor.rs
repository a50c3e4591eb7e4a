//! Request execution — the seam between the request tools and the network.
//!
//! [`RequestsTool`](super::requests::RequestsTool) builds an [`HttpRequest`]
//! and hands it to a [`RequestExecutor`]. Production uses [`HttpExecutor`]
//! (reqwest); tests plug in a recording mock.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use scenepilot_core::apispec::HttpMethod;

use super::base::ToolError;

/// A fully resolved request against the scene service.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, path parameters already substituted.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON body (only for POST/PUT/PATCH).
    pub body: Option<Value>,
}

/// Status and body text of a completed request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests. Any HTTP status is an `Ok`; only transport failures are
/// `Err(ToolError::ExecutionFailed { status: None, .. })`.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ToolError>;
}

// ─────────────────────────────────────────────
// reqwest-backed executor
// ─────────────────────────────────────────────

pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ToolError> {
        debug!(method = %request.method, url = %request.url, "sending tool request");

        let mut builder = self.client.request(to_reqwest(request.method), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "tool request failed");
            ToolError::ExecutionFailed {
                status: None,
                body: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ToolError::ExecutionFailed {
            status: Some(status),
            body: format!("failed to read response body: {e}"),
        })?;

        debug!(status = status, bytes = body.len(), "tool response received");
        Ok(HttpResponse { status, body })
    }
}
