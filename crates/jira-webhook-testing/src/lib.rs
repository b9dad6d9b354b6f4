//! Test infrastructure for the Jira webhook receiver.
//!
//! Provides instrumented handlers, payload fixtures, an in-process
//! [`TestEnv`] that drives the router with `tower::ServiceExt::oneshot`, and a
//! [`TestServer`] that serves the router over a real TCP socket.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{body::Body, Router};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use jira_webhook_api::{create_router, Config};
use jira_webhook_core::HandlerRegistry;
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub mod fixtures;
pub mod handlers;

pub use fixtures::PayloadBuilder;
pub use handlers::{CallLog, FailingHandler, PanickingHandler, RecordingHandler, SequencedHandler};

/// In-process environment wrapping a fully configured router.
///
/// Every request goes through the same middleware stack as production.
pub struct TestEnv {
    router: Router,
    config: Config,
}

impl TestEnv {
    /// Builds an environment with the default configuration.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_config(Config::default(), registry)
    }

    /// Builds an environment with a custom configuration.
    pub fn with_config(config: Config, registry: HandlerRegistry) -> Self {
        let router = create_router(&config, registry);
        Self { router, config }
    }

    /// The configuration the router was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// POSTs a JSON value to the webhook path.
    pub async fn post_json(&self, payload: &Value) -> Result<TestResponse> {
        let body = serde_json::to_vec(payload).context("serialize payload")?;
        self.post_raw(body).await
    }

    /// POSTs raw bytes to the webhook path.
    pub async fn post_raw(&self, body: impl Into<Bytes>) -> Result<TestResponse> {
        let path = self.config.webhook_path.clone();
        self.send(Method::POST, &path, body.into()).await
    }

    /// Sends a GET request to `path`.
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.send(Method::GET, path, Bytes::new()).await
    }

    /// Sends an arbitrary request through the router.
    pub async fn send(&self, method: Method, path: &str, body: Bytes) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .context("build request")?;

        let response = self.router.clone().oneshot(request).await.context("execute request")?;
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok(TestResponse { status, request_id, body })
    }
}

/// Buffered response from a [`TestEnv`] request.
#[derive(Debug, Clone)]
pub struct TestResponse {
    /// Response status
    pub status: StatusCode,
    /// Value of the `X-Request-Id` header, if set
    pub request_id: Option<String>,
    /// Full response body
    pub body: Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("parse response json")
    }

    /// The `error` field of a JSON error body.
    pub fn error_message(&self) -> Option<String> {
        self.json().ok()?.get("error")?.as_str().map(String::from)
    }

    /// The body decoded as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Receiver served over TCP on an ephemeral local port.
///
/// The server task is aborted when the value is dropped.
pub struct TestServer {
    addr: SocketAddr,
    webhook_path: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Starts serving `registry` with `config` on `127.0.0.1:0`.
    pub async fn spawn(config: Config, registry: HandlerRegistry) -> Result<Self> {
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.context("bind test listener")?;
        let addr = listener.local_addr().context("read local addr")?;
        let app = create_router(&config, registry);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server failed: {e}");
            }
        });

        Ok(Self { addr, webhook_path: config.webhook_path, handle })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL of the webhook receiver.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.url(), self.webhook_path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
