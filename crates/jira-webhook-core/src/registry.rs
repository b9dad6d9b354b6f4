//! Event-type keyed handler registry and synchronous dispatch.
//!
//! The registry maps an event type string to the handlers registered for it,
//! in registration order. It only grows: handlers are appended and never
//! replaced or removed.
//!
//! Registration takes `&mut self`. Once the registry is handed to the HTTP
//! receiver it is shared behind an `Arc` and can no longer be modified, so
//! all registration happens before the first request is served and dispatch
//! needs no locking.

use std::{collections::HashMap, fmt, panic::AssertUnwindSafe, str::FromStr, sync::Arc};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::{
    error::{DispatchError, HandlerError},
    handler::WebhookHandler,
    payload::{WebhookPayload, DEFAULT_EVENT_TYPE},
};

/// What dispatch does when a handler fails or panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Log the failure and keep invoking the remaining handlers.
    #[default]
    Isolate,
    /// Stop at the first failure and return it to the caller.
    FailFast,
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolate => f.write_str("isolate"),
            Self::FailFast => f.write_str("fail_fast"),
        }
    }
}

impl FromStr for DispatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isolate" => Ok(Self::Isolate),
            "fail_fast" => Ok(Self::FailFast),
            other => Err(format!("unknown dispatch policy '{other}'")),
        }
    }
}

/// A handler failure recorded under [`DispatchPolicy::Isolate`].
#[derive(Debug)]
pub struct HandlerFailure {
    /// Name of the failing handler
    pub handler: String,
    /// Zero-based position in registration order
    pub position: usize,
    /// What went wrong
    pub error: HandlerError,
}

/// Outcome of dispatching one event.
#[derive(Debug)]
pub struct DispatchReport {
    /// Event type that was dispatched
    pub event_type: String,
    /// Number of handlers invoked, including failed ones
    pub invoked: usize,
    /// Failures that were isolated
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    /// Returns true if every invoked handler succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of handlers that completed without error.
    pub fn succeeded(&self) -> usize {
        self.invoked - self.failures.len()
    }
}

/// In-memory mapping from event type to an ordered list of handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn WebhookHandler>>>,
    policy: DispatchPolicy,
}

impl HandlerRegistry {
    /// Creates an empty registry with the [`DispatchPolicy::Isolate`] policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given failure policy.
    pub fn with_policy(policy: DispatchPolicy) -> Self {
        Self { handlers: HashMap::new(), policy }
    }

    /// The failure policy applied by [`HandlerRegistry::dispatch`].
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Appends `handler` to the handlers for `event_type`.
    ///
    /// Never replaces an existing handler and does not deduplicate:
    /// registering the same handler twice makes it run twice per event.
    /// Returns the handler unchanged so registration can be chained.
    pub fn register<H>(&mut self, event_type: impl Into<String>, handler: Arc<H>) -> Arc<H>
    where
        H: WebhookHandler + 'static,
    {
        let event_type = event_type.into();
        debug!(event_type = %event_type, handler = handler.name(), "Registering webhook handler");

        let erased: Arc<dyn WebhookHandler> = handler.clone();
        self.handlers.entry(event_type).or_default().push(erased);
        handler
    }

    /// Registers `handler` for [`DEFAULT_EVENT_TYPE`] (`jira:issue_updated`).
    pub fn hook<H>(&mut self, handler: Arc<H>) -> Arc<H>
    where
        H: WebhookHandler + 'static,
    {
        self.register(DEFAULT_EVENT_TYPE, handler)
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Event types with at least one registered handler, in no particular
    /// order.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns true if no handler has been registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes every handler registered for `event_type`, in registration
    /// order.
    ///
    /// An event type with no handlers is a no-op, not an error. Panics inside
    /// handlers are caught and treated as failures.
    ///
    /// # Errors
    ///
    /// Under [`DispatchPolicy::FailFast`], returns the first handler failure;
    /// the handlers after it are not invoked. Under
    /// [`DispatchPolicy::Isolate`] this never fails and failures are listed
    /// in the report instead.
    pub async fn dispatch(
        &self,
        event_type: &str,
        payload: &WebhookPayload,
    ) -> Result<DispatchReport, DispatchError> {
        let handlers = self.handlers.get(event_type).map(Vec::as_slice).unwrap_or_default();
        let mut report =
            DispatchReport { event_type: event_type.to_string(), invoked: 0, failures: Vec::new() };

        if handlers.is_empty() {
            debug!(event_type, "No handlers registered for event type");
            return Ok(report);
        }

        for (position, handler) in handlers.iter().enumerate() {
            trace!(event_type, position, handler = handler.name(), "Invoking handler");
            report.invoked += 1;

            let outcome = AssertUnwindSafe(handler.handle(payload)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => HandlerError::from_panic(&*panic),
            };

            match self.policy {
                DispatchPolicy::Isolate => {
                    error!(
                        event_type,
                        position,
                        handler = handler.name(),
                        error = %error,
                        "Webhook handler failed, continuing with remaining handlers"
                    );
                    report.failures.push(HandlerFailure {
                        handler: handler.name().to_string(),
                        position,
                        error,
                    });
                },
                DispatchPolicy::FailFast => {
                    warn!(
                        event_type,
                        position,
                        handler = handler.name(),
                        skipped = handlers.len() - position - 1,
                        "Webhook handler failed, aborting dispatch"
                    );
                    return Err(DispatchError {
                        event_type: event_type.to_string(),
                        handler: handler.name().to_string(),
                        position,
                        source: error,
                    });
                },
            }
        }

        Ok(report)
    }

    /// Dispatches `payload` under its own event type.
    ///
    /// A payload whose `webhookEvent` is not a string has no dispatch key and
    /// reaches no handler, even one registered under the same text.
    ///
    /// # Errors
    ///
    /// Same as [`HandlerRegistry::dispatch`].
    pub async fn dispatch_payload(
        &self,
        payload: &WebhookPayload,
    ) -> Result<DispatchReport, DispatchError> {
        match payload.dispatch_key() {
            Some(event_type) => self.dispatch(event_type, payload).await,
            None => {
                debug!(
                    event_type = payload.event_type(),
                    "Non-string event type matches no handlers"
                );
                Ok(DispatchReport {
                    event_type: payload.event_type().to_string(),
                    invoked: 0,
                    failures: Vec::new(),
                })
            },
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> =
            self.handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::{error::HandlerResult, handler::handler_fn};

    #[derive(Debug, Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl WebhookHandler for CountingHandler {
        async fn handle(&self, _payload: &WebhookPayload) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn payload(event_type: &str) -> WebhookPayload {
        WebhookPayload::from_value(json!({"webhookEvent": event_type})).unwrap()
    }

    #[test]
    fn register_returns_same_handler() {
        let mut registry = HandlerRegistry::new();
        let handler = Arc::new(CountingHandler::default());

        let returned = registry.register("jira:issue_created", handler.clone());

        assert!(Arc::ptr_eq(&handler, &returned));
        assert_eq!(registry.handler_count("jira:issue_created"), 1);
        assert_eq!(registry.handler_count("jira:issue_updated"), 0);
    }

    #[test]
    fn hook_uses_default_event_type() {
        let mut registry = HandlerRegistry::new();
        registry.hook(Arc::new(CountingHandler::default()));

        assert_eq!(registry.event_types().collect::<Vec<_>>(), vec![DEFAULT_EVENT_TYPE]);
    }

    #[tokio::test]
    async fn dispatch_unknown_event_type_is_noop() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        let report = registry.dispatch("jira:unknown", &payload("jira:unknown")).await.unwrap();

        assert_eq!(report.invoked, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn dispatch_only_reaches_matching_event_type() {
        let mut registry = HandlerRegistry::new();
        let updated = registry.register("jira:issue_updated", Arc::new(CountingHandler::default()));
        let created = registry.register("jira:issue_created", Arc::new(CountingHandler::default()));

        registry.dispatch("jira:issue_updated", &payload("jira:issue_updated")).await.unwrap();

        assert_eq!(updated.calls.load(Ordering::SeqCst), 1);
        assert_eq!(created.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn isolate_policy_records_failures_and_continues() {
        let mut registry = HandlerRegistry::new();
        registry.hook(Arc::new(handler_fn(|_| Err(HandlerError::msg("broken"))).named("broken")));
        let after = registry.hook(Arc::new(CountingHandler::default()));

        let report =
            registry.dispatch(DEFAULT_EVENT_TYPE, &payload(DEFAULT_EVENT_TYPE)).await.unwrap();

        assert_eq!(report.invoked, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failures[0].handler, "broken");
        assert_eq!(report.failures[0].position, 0);
        assert_eq!(after.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fail_fast_policy_stops_at_first_failure() {
        let mut registry = HandlerRegistry::with_policy(DispatchPolicy::FailFast);
        registry.hook(Arc::new(handler_fn(|_| Err(HandlerError::msg("broken"))).named("broken")));
        let after = registry.hook(Arc::new(CountingHandler::default()));

        let err =
            registry.dispatch(DEFAULT_EVENT_TYPE, &payload(DEFAULT_EVENT_TYPE)).await.unwrap_err();

        assert_eq!(err.handler, "broken");
        assert_eq!(err.position, 0);
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_handler_is_caught() {
        let mut registry = HandlerRegistry::new();
        registry.hook(Arc::new(handler_fn(|_| panic!("handler exploded"))));
        let after = registry.hook(Arc::new(CountingHandler::default()));

        let report =
            registry.dispatch(DEFAULT_EVENT_TYPE, &payload(DEFAULT_EVENT_TYPE)).await.unwrap();

        assert!(matches!(
            &report.failures[0].error,
            HandlerError::Panicked { message } if message == "handler exploded"
        ));
        assert_eq!(after.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_payload_skips_non_string_event_types() {
        let mut registry = HandlerRegistry::new();
        let numeric = registry.register("42", Arc::new(CountingHandler::default()));
        let textual = registry.register("true", Arc::new(CountingHandler::default()));

        for event in [json!(42), json!(true)] {
            let payload = WebhookPayload::from_value(json!({"webhookEvent": event})).unwrap();
            let report = registry.dispatch_payload(&payload).await.unwrap();
            assert_eq!(report.invoked, 0);
        }
        assert_eq!(numeric.calls.load(Ordering::SeqCst), 0);
        assert_eq!(textual.calls.load(Ordering::SeqCst), 0);

        registry.dispatch_payload(&payload("42")).await.unwrap();
        assert_eq!(numeric.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("isolate".parse::<DispatchPolicy>().unwrap(), DispatchPolicy::Isolate);
        assert_eq!("fail_fast".parse::<DispatchPolicy>().unwrap(), DispatchPolicy::FailFast);
        assert!("retry".parse::<DispatchPolicy>().is_err());
        assert_eq!(DispatchPolicy::FailFast.to_string(), "fail_fast");
    }
}
