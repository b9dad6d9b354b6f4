//! Decoded webhook payloads and permissive field lookup.
//!
//! A [`WebhookPayload`] is the full JSON object sent by Jira. Only the
//! `webhookEvent` field is required; every other field is read through
//! [`extract`], which treats any missing level as absent instead of failing.

use std::{fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::{error::ValidationError, models::IssueEventSummary};

/// Event type that handlers are registered for when none is given.
pub const DEFAULT_EVENT_TYPE: &str = "jira:issue_updated";

/// Top-level field carrying the event type.
pub const EVENT_TYPE_FIELD: &str = "webhookEvent";

/// Immutable, cheaply cloneable view of a decoded webhook body.
///
/// Handlers only ever see `&WebhookPayload`, so no handler can alter the
/// payload observed by the handlers that run after it.
#[derive(Clone, PartialEq)]
pub struct WebhookPayload {
    event_type: String,
    keyed: bool,
    raw: Arc<Map<String, Value>>,
}

impl WebhookPayload {
    /// Parses and validates a request body.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NotJson`] if the body is empty, is not valid JSON,
    ///   or is valid JSON but not an object.
    /// - [`ValidationError::MissingEventType`] if `webhookEvent` is missing or
    ///   `null`.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::NotJson)?;
        Self::from_value(value)
    }

    /// Validates an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`WebhookPayload::from_slice`], minus the decoding step.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(map) = value else {
            return Err(ValidationError::NotJson);
        };

        let (event_type, keyed) = match map.get(EVENT_TYPE_FIELD) {
            None | Some(Value::Null) => return Err(ValidationError::MissingEventType),
            Some(Value::String(s)) => (s.clone(), true),
            // Accepted, but never equal to a registered string key.
            Some(other) => (other.to_string(), false),
        };

        Ok(Self { event_type, keyed, raw: Arc::new(map) })
    }

    /// The `webhookEvent` value; non-string values are rendered as JSON text.
    ///
    /// Use [`WebhookPayload::dispatch_key`] to look up handlers.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The registry key for this payload.
    ///
    /// `None` when `webhookEvent` is not a string: handlers are registered
    /// under string keys, so a number or boolean matches none of them.
    pub fn dispatch_key(&self) -> Option<&str> {
        self.keyed.then_some(self.event_type.as_str())
    }

    /// The full decoded object, exactly as received.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Looks up a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw.get(name).filter(|v| !v.is_null())
    }

    /// Looks up a nested field, returning `None` at the first missing level.
    ///
    /// ```
    /// use jira_webhook_core::WebhookPayload;
    ///
    /// let payload = WebhookPayload::from_slice(
    ///     br#"{"webhookEvent": "jira:issue_updated", "issue": {"key": "PROJ-1"}}"#,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(payload.get(&["issue", "key"]).and_then(|v| v.as_str()), Some("PROJ-1"));
    /// assert!(payload.get(&["issue", "fields", "summary"]).is_none());
    /// ```
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        extract(self.field(first)?, rest)
    }

    /// Convenience accessor for a nested string field.
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Issue key (`issue.key`), if present.
    pub fn issue_key(&self) -> Option<&str> {
        self.get_str(&["issue", "key"])
    }

    /// Projects the payload onto the typed [`IssueEventSummary`].
    ///
    /// This is an opt-in helper for handlers; dispatch always passes the raw
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a known field is present with an incompatible type.
    pub fn summary(&self) -> serde_json::Result<IssueEventSummary> {
        IssueEventSummary::from_object(&self.raw)
    }

    /// Clones the payload into an owned [`Value`].
    pub fn to_value(&self) -> Value {
        Value::Object(self.raw.as_ref().clone())
    }
}

impl fmt::Debug for WebhookPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookPayload")
            .field("event_type", &self.event_type)
            .field("fields", &self.raw.len())
            .finish()
    }
}

impl fmt::Display for WebhookPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self.raw.as_ref()) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{{\"{EVENT_TYPE_FIELD}\":\"{}\"}}", self.event_type),
        }
    }
}

impl TryFrom<Value> for WebhookPayload {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Extracts an optional nested field from a loosely typed JSON tree.
///
/// Each path segment selects an object key, or an array index when the
/// current node is an array and the segment parses as one. Returns `None`
/// if any level is missing, `null`, or not a container.
pub fn extract<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() {
        None
    } else {
        Some(current)
    }
}
