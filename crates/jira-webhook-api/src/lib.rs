//! HTTP receiver for Jira webhooks.
//!
//! Binds a [`HandlerRegistry`](jira_webhook_core::HandlerRegistry) to a POST
//! route, validates incoming bodies, and dispatches each event to the handlers
//! registered for its `webhookEvent` type.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use handlers::receive::{ErrorResponse, ReceiveError};
pub use server::{bind, create_router, start_server};
