//! Instrumented handlers for asserting dispatch behavior.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use jira_webhook_core::{HandlerError, HandlerResult, WebhookHandler, WebhookPayload};
use serde_json::Value;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records every payload it receives.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    received: Mutex<Vec<Value>>,
}

impl RecordingHandler {
    /// Creates a new recording handler ready for registration.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of times the handler was invoked.
    pub fn call_count(&self) -> usize {
        lock(&self.received).len()
    }

    /// Payloads received so far, in invocation order.
    pub fn received(&self) -> Vec<Value> {
        lock(&self.received).clone()
    }

    /// The most recent payload, if any.
    pub fn last(&self) -> Option<Value> {
        lock(&self.received).last().cloned()
    }
}

#[async_trait::async_trait]
impl WebhookHandler for RecordingHandler {
    async fn handle(&self, payload: &WebhookPayload) -> HandlerResult {
        lock(&self.received).push(payload.to_value());
        Ok(())
    }
}

/// Shared log that several [`SequencedHandler`]s append their label to.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty call log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handler that appends `label` to this log when invoked.
    pub fn handler(&self, label: impl Into<String>) -> Arc<SequencedHandler> {
        Arc::new(SequencedHandler { label: label.into(), log: self.clone() })
    }

    /// Labels in the order their handlers ran.
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }
}

/// Handler that records its label in a [`CallLog`].
#[derive(Debug)]
pub struct SequencedHandler {
    label: String,
    log: CallLog,
}

#[async_trait::async_trait]
impl WebhookHandler for SequencedHandler {
    async fn handle(&self, _payload: &WebhookPayload) -> HandlerResult {
        lock(&self.log.entries).push(self.label.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Handler that always returns an error.
#[derive(Debug, Default)]
pub struct FailingHandler {
    attempts: AtomicUsize,
}

impl FailingHandler {
    /// Creates a new failing handler ready for registration.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of times the handler was invoked.
    pub fn call_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WebhookHandler for FailingHandler {
    async fn handle(&self, payload: &WebhookPayload) -> HandlerResult {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HandlerError::msg(format!("refusing {}", payload.event_type())))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Handler that panics on every invocation.
#[derive(Debug, Default)]
pub struct PanickingHandler;

#[async_trait::async_trait]
impl WebhookHandler for PanickingHandler {
    async fn handle(&self, _payload: &WebhookPayload) -> HandlerResult {
        panic!("panicking handler invoked");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}
