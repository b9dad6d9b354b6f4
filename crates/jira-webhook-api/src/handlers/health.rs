//! Index and liveness endpoints.

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};

/// Static description served on `GET /`.
pub const SERVICE_DESCRIPTION: &str = "This is a JIRA webhook service";

/// Liveness response structure.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    /// Always `alive` while the server is answering requests
    pub status: &'static str,
    /// When the check was performed
    pub timestamp: chrono::DateTime<Utc>,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Returns the static service description.
pub async fn index() -> &'static str {
    SERVICE_DESCRIPTION
}

/// Liveness check endpoint.
///
/// Does not touch the registry or any handler; it only reports that the HTTP
/// server is responding.
#[instrument(name = "health_check")]
pub async fn health_check() -> impl IntoResponse {
    debug!("Performing liveness check");

    let response = LivenessResponse {
        status: "alive",
        timestamp: Utc::now(),
        service: "jira-webhook",
        version: env!("CARGO_PKG_VERSION"),
    };

    (StatusCode::OK, Json(response))
}
