//! HTTP request handlers.
//!
//! - `receive` - the webhook receiver bound to the configured path
//! - `health` - index description and liveness probe
//!
//! Rejected webhook requests get a 400 with a `{"error": "..."}` body.
//! Accepted requests get an empty 200 whatever the handlers did, unless the
//! fail-fast dispatch policy is configured and a handler failed.

pub mod health;
pub mod receive;

pub use health::{health_check, index};
pub use receive::receive_webhook;
