//! Builders for Jira webhook payloads.

use serde_json::{json, Map, Value};

/// Minimal `jira:issue_updated` payload for the given issue key.
pub fn issue_updated(issue_key: &str) -> Value {
    PayloadBuilder::new("jira:issue_updated").issue_key(issue_key).build()
}

/// A realistic issue update carrying a comment and a status transition.
pub fn full_issue_updated() -> Value {
    PayloadBuilder::new("jira:issue_updated")
        .timestamp(1_700_000_000_000)
        .issue_event_type_name("issue_generic")
        .user("alice", "alice@example.com")
        .issue_key("PROJ-42")
        .field("id", json!("10042"))
        .summary("Checkout fails on empty cart")
        .status("In Progress", "indeterminate")
        .comment("20001", "bob", "Reproduced on staging")
        .changelog_item("status", "Open", "In Progress")
        .build()
}

/// Fluent builder for webhook payloads.
///
/// # Example
///
/// ```
/// use jira_webhook_testing::fixtures::PayloadBuilder;
///
/// let payload = PayloadBuilder::new("comment_created")
///     .issue_key("OPS-7")
///     .comment("1", "carol", "On it")
///     .build();
///
/// assert_eq!(payload["issue"]["key"], "OPS-7");
/// ```
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    root: Map<String, Value>,
}

impl PayloadBuilder {
    /// Starts a payload with the given `webhookEvent`.
    pub fn new(event_type: &str) -> Self {
        let mut root = Map::new();
        root.insert("webhookEvent".to_string(), json!(event_type));
        Self { root }
    }

    /// Starts a payload without any `webhookEvent` field.
    pub fn without_event_type() -> Self {
        Self { root: Map::new() }
    }

    /// Sets the event timestamp in milliseconds.
    pub fn timestamp(self, millis: i64) -> Self {
        self.set(&["timestamp"], json!(millis))
    }

    /// Sets `issue_event_type_name`.
    pub fn issue_event_type_name(self, name: &str) -> Self {
        self.set(&["issue_event_type_name"], json!(name))
    }

    /// Sets the acting user.
    pub fn user(self, name: &str, email: &str) -> Self {
        self.set(
            &["user"],
            json!({"name": name, "key": name, "emailAddress": email, "active": true}),
        )
    }

    /// Sets `issue.key`.
    pub fn issue_key(self, key: &str) -> Self {
        self.set(&["issue", "key"], json!(key))
    }

    /// Sets an arbitrary field on the issue.
    pub fn field(self, name: &str, value: Value) -> Self {
        self.set(&["issue", name], value)
    }

    /// Sets `issue.fields.summary`.
    pub fn summary(self, summary: &str) -> Self {
        self.set(&["issue", "fields", "summary"], json!(summary))
    }

    /// Sets `issue.fields.status`.
    pub fn status(self, name: &str, category_key: &str) -> Self {
        self.set(
            &["issue", "fields", "status"],
            json!({"name": name, "id": "3", "statusCategory": {"id": 4, "key": category_key}}),
        )
    }

    /// Sets the event comment.
    pub fn comment(self, id: &str, author: &str, body: &str) -> Self {
        self.set(
            &["comment"],
            json!({
                "id": id,
                "author": {"name": author, "key": author, "active": true},
                "body": body,
                "created": "2024-01-15T10:30:00.000+0000",
                "updated": "2024-01-15T10:30:00.000+0000"
            }),
        )
    }

    /// Appends a changelog item.
    pub fn changelog_item(mut self, field: &str, from: &str, to: &str) -> Self {
        let changelog = self
            .root
            .entry("changelog")
            .or_insert_with(|| json!({"id": "30001", "items": []}));
        if let Some(items) = changelog.get_mut("items").and_then(Value::as_array_mut) {
            items.push(json!({
                "field": field,
                "fieldtype": "jira",
                "from": null,
                "fromString": from,
                "to": null,
                "toString": to
            }));
        }
        self
    }

    /// Sets a value at an arbitrary path, creating intermediate objects.
    pub fn set(mut self, path: &[&str], value: Value) -> Self {
        let Some((last, parents)) = path.split_last() else {
            return self;
        };

        let mut node = &mut self.root;
        for segment in parents {
            let child = node.entry(*segment).or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child {
                Value::Object(map) => map,
                _ => unreachable!("child was just replaced with an object"),
            };
        }
        node.insert((*last).to_string(), value);
        self
    }

    /// Finishes the payload.
    pub fn build(self) -> Value {
        Value::Object(self.root)
    }

    /// Finishes the payload as a serialized request body.
    ///
    /// # Panics
    ///
    /// Panics if the payload cannot be serialized.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.root).expect("webhook payload serializes to JSON")
    }
}
