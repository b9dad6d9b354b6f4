#![no_main]

//! Fuzz target for webhook payload parsing.
//!
//! Feeds arbitrary request bodies through the same parsing the receiver
//! runs, then walks whatever was accepted. Nothing here may panic.

use jira_webhook_core::{extract, ValidationError, WebhookPayload, EVENT_TYPE_FIELD};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    fuzz_payload_parsing(data);
});

fn fuzz_payload_parsing(data: &[u8]) {
    let payload = match WebhookPayload::from_slice(data) {
        Ok(payload) => payload,
        Err(ValidationError::NotJson) => {
            // Anything serde_json reads as an object must have been accepted
            // or rejected for a missing event type instead.
            assert!(!matches!(serde_json::from_slice::<Value>(data), Ok(Value::Object(_))));
            return;
        },
        Err(ValidationError::MissingEventType) => return,
    };

    let event = payload.field(EVENT_TYPE_FIELD);
    assert!(event.is_some_and(|v| !v.is_null()));
    assert_eq!(payload.dispatch_key(), event.and_then(Value::as_str));

    let _ = payload.issue_key();
    let _ = payload.get_str(&["issue", "fields", "status", "name"]);
    let _ = payload.summary();
    let _ = payload.to_string();

    let raw = payload.to_value();
    for path in [&["issue", "key"][..], &["changelog", "items", "0", "field"], &["comment"]] {
        if let Some(found) = extract(&raw, path) {
            assert!(!found.is_null());
        }
    }
}
