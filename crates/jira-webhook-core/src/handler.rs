//! Handler trait invoked for dispatched webhook events.
//!
//! Applications implement [`WebhookHandler`] directly for stateful or async
//! handlers, or wrap a synchronous closure with [`handler_fn`].

use std::fmt;

use crate::{error::HandlerResult, payload::WebhookPayload};

/// Behavior invoked when an event of a registered type is received.
///
/// Handlers get a shared, immutable view of the full decoded payload. The
/// returned result is only used to decide whether dispatch continues and
/// what gets logged; it is never reported back to the webhook sender.
#[async_trait::async_trait]
pub trait WebhookHandler: Send + Sync + fmt::Debug {
    /// Handles a single webhook payload.
    async fn handle(&self, payload: &WebhookPayload) -> HandlerResult;

    /// Name used to identify this handler in logs and dispatch errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler backed by a synchronous closure.
///
/// Created with [`handler_fn`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wraps a closure as a [`WebhookHandler`].
///
/// ```
/// use std::sync::Arc;
///
/// use jira_webhook_core::{handler_fn, HandlerRegistry};
///
/// let mut registry = HandlerRegistry::new();
/// registry.hook(Arc::new(handler_fn(|payload| {
///     println!("issue {:?} updated", payload.issue_key());
///     Ok(())
/// })));
///
/// assert_eq!(registry.handler_count("jira:issue_updated"), 1);
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&WebhookPayload) -> HandlerResult + Send + Sync,
{
    FnHandler { name: std::any::type_name::<F>().to_string(), f }
}

impl<F> FnHandler<F> {
    /// Overrides the name reported in logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<F> WebhookHandler for FnHandler<F>
where
    F: Fn(&WebhookPayload) -> HandlerResult + Send + Sync,
{
    async fn handle(&self, payload: &WebhookPayload) -> HandlerResult {
        (self.f)(payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handler that discards every payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

#[async_trait::async_trait]
impl WebhookHandler for NoOpHandler {
    async fn handle(&self, _payload: &WebhookPayload) -> HandlerResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::HandlerError;

    fn payload() -> WebhookPayload {
        WebhookPayload::from_value(json!({"webhookEvent": "jira:issue_updated"})).unwrap()
    }

    #[tokio::test]
    async fn fn_handler_invokes_closure() {
        let calls = AtomicUsize::new(0);
        let handler = handler_fn(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        handler.handle(&payload()).await.unwrap();
        handler.handle(&payload()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fn_handler_propagates_errors() {
        let handler = handler_fn(|_| Err(HandlerError::msg("nope")));
        let err = handler.handle(&payload()).await.unwrap_err();
        assert_eq!(err.to_string(), "handler failed: nope");
    }

    #[test]
    fn named_overrides_default_name() {
        let handler = handler_fn(|_| Ok(())).named("audit");
        assert_eq!(WebhookHandler::name(&handler), "audit");
        assert!(format!("{handler:?}").contains("audit"));
    }

    #[tokio::test]
    async fn no_op_handler_accepts_anything() {
        NoOpHandler.handle(&payload()).await.unwrap();
        assert!(NoOpHandler.name().ends_with("NoOpHandler"));
    }
}
