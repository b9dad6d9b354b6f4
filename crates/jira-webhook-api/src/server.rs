//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response tracing
//! 3. Timeout enforcement (covers handler execution)
//! 4. Body size limit
//! 5. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server handles CTRL+C and SIGTERM by refusing new connections and
//! letting in-flight requests, including running webhook handlers, finish.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use jira_webhook_core::HandlerRegistry;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{handlers, Config};

/// Binds the webhook receiver for `registry` to `POST path` on `router`.
///
/// The registry is frozen at this point: it is moved behind an `Arc` and no
/// further handlers can be registered.
///
/// # Panics
///
/// Panics if `path` does not start with `/` or if `router` already has a
/// POST route for `path`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use axum::{routing::get, Router};
/// use jira_webhook_core::{handler_fn, HandlerRegistry};
///
/// let mut registry = HandlerRegistry::new();
/// registry.hook(Arc::new(handler_fn(|payload| {
///     tracing::info!(event = payload.event_type(), "got event");
///     Ok(())
/// })));
///
/// let app = Router::new().route("/", get(|| async { "hello" }));
/// let app = jira_webhook_api::bind(app, "/jira", registry);
/// # let _: Router = app;
/// ```
pub fn bind(router: Router, path: &str, registry: HandlerRegistry) -> Router {
    info!(
        path,
        policy = %registry.policy(),
        event_types = registry.event_types().count(),
        "Binding webhook receiver"
    );

    let receiver = Router::new()
        .route(path, post(handlers::receive_webhook))
        .with_state(Arc::new(registry));

    router.merge(receiver)
}

/// Creates the Axum router with all routes and middleware.
///
/// Sets up:
/// - `GET /` static service description
/// - `GET /health` liveness probe
/// - `POST {webhook_path}` webhook receiver
/// - Request tracing, timeout and body size limit from `config`
pub fn create_router(config: &Config, registry: HandlerRegistry) -> Router {
    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check));

    bind(app, &config.webhook_path, registry)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header so a webhook delivery can be matched to its log
/// lines.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Binds to the configured address and serves requests until a shutdown
/// signal is received.
///
/// # Errors
///
/// Returns `std::io::Error` if:
/// - The configured address cannot be parsed
/// - Port is already in use
/// - Network interface unavailable
pub async fn start_server(config: &Config, registry: HandlerRegistry) -> Result<(), std::io::Error> {
    let addr: SocketAddr = config
        .parse_server_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let app = create_router(config, registry);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(path = %config.webhook_path, "HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight webhook dispatches to complete");
}
