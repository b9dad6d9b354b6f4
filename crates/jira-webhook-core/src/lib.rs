//! Handler registry and dispatch for Jira webhook events.
//!
//! Provides the payload model, the [`WebhookHandler`] trait, and the
//! [`HandlerRegistry`] that maps an event type to the handlers invoked when a
//! matching webhook arrives. The HTTP side lives in `jira-webhook-api`.

#![forbid(unsafe_code)]

pub mod error;
pub mod handler;
pub mod models;
pub mod payload;
pub mod registry;

pub use error::{DispatchError, HandlerError, HandlerResult, ValidationError};
pub use handler::{handler_fn, FnHandler, NoOpHandler, WebhookHandler};
pub use models::IssueEventSummary;
pub use payload::{extract, WebhookPayload, DEFAULT_EVENT_TYPE, EVENT_TYPE_FIELD};
pub use registry::{DispatchPolicy, DispatchReport, HandlerFailure, HandlerRegistry};
