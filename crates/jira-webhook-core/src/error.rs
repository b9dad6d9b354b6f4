//! Error taxonomy for webhook validation and handler dispatch.
//!
//! Validation errors are recovered at the HTTP boundary and reported to the
//! sender. Handler errors are either isolated by the registry or surfaced as
//! a [`DispatchError`], depending on the configured dispatch policy.

use thiserror::Error;

/// Result type returned by webhook handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Malformed or incomplete request body.
///
/// The `Display` output of each variant is the exact message returned to the
/// sender in the `error` field of the 400 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Body is empty, not valid JSON, or not a JSON object.
    #[error("Request body must contain json")]
    NotJson,

    /// Body is a JSON object without a non-null `webhookEvent` field.
    #[error("Request body must contain webhookEvent")]
    MissingEventType,
}

/// Failure raised by a registered handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler returned an error.
    #[error("handler failed: {0}")]
    Failed(#[from] anyhow::Error),

    /// Handler panicked while processing the payload.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic message, if one could be recovered
        message: String,
    },
}

impl HandlerError {
    /// Creates a [`HandlerError::Failed`] from a plain message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Failed(anyhow::Error::msg(message))
    }

    /// Builds a [`HandlerError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(panic: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked { message }
    }
}

/// A handler failure that aborted dispatch under the fail-fast policy.
#[derive(Debug, Error)]
#[error("dispatch of '{event_type}' aborted by handler #{position} ({handler}): {source}")]
pub struct DispatchError {
    /// Event type being dispatched
    pub event_type: String,
    /// Name of the failing handler
    pub handler: String,
    /// Zero-based position of the handler in registration order
    pub position: usize,
    /// Underlying handler failure
    #[source]
    pub source: HandlerError,
}
