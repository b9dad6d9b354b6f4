//! Webhook receiver: validates the body and drives registry dispatch.
//!
//! The receiver accepts one JSON object per POST, requires a non-null
//! `webhookEvent` field, and synchronously invokes every handler registered
//! for that event type before responding. The handlers see the raw decoded
//! payload.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use jira_webhook_core::{DispatchError, HandlerRegistry, ValidationError, WebhookPayload};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

/// Error body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason the request was rejected
    pub error: String,
}

/// Errors surfaced by the receiver.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Body failed validation; reported as 400 with a JSON error body.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A handler aborted dispatch under the fail-fast policy; reported as 500
    /// with an empty body.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ReceiveError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReceiveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Validation(e) => {
                (status, Json(ErrorResponse { error: e.to_string() })).into_response()
            },
            Self::Dispatch(_) => status.into_response(),
        }
    }
}

/// Receives a Jira webhook and dispatches it to the registered handlers.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Body is not a JSON object, or lacks `webhookEvent`
/// - 500: A handler failed under the fail-fast dispatch policy
#[instrument(
    name = "receive_webhook",
    skip(registry, body),
    fields(content_length = body.len(), event_type = tracing::field::Empty)
)]
pub async fn receive_webhook(
    State(registry): State<Arc<HandlerRegistry>>,
    body: Bytes,
) -> Result<StatusCode, ReceiveError> {
    let payload = WebhookPayload::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejecting webhook request");
        e
    })?;

    tracing::Span::current().record("event_type", payload.event_type());
    debug!(issue_key = payload.issue_key(), "Webhook payload validated");
    trace!(payload = %payload, "Raw webhook payload");

    match registry.dispatch_payload(&payload).await {
        Ok(report) => {
            if report.is_clean() {
                info!(handlers = report.invoked, "Webhook dispatched");
            } else {
                warn!(
                    handlers = report.invoked,
                    failed = report.failures.len(),
                    "Webhook dispatched with handler failures"
                );
            }
            Ok(StatusCode::OK)
        },
        Err(e) => {
            error!(error = %e, "Webhook dispatch aborted");
            Err(e.into())
        },
    }
}
