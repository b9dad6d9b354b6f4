//! Typed projection of the fields Jira sends with issue events.
//!
//! Every field is optional: an absent or `null` value at any level decodes as
//! `None`, or as an empty list for list fields. Unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The subset of an issue event that most handlers care about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueEventSummary {
    /// Event time in milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
    /// Event type, e.g. `jira:issue_updated`
    pub webhook_event: Option<String>,
    /// Finer-grained issue event name, e.g. `issue_commented`
    #[serde(rename = "issue_event_type_name")]
    pub issue_event_type_name: Option<String>,
    /// User who triggered the event
    pub user: Option<UserRef>,
    /// Issue the event refers to
    pub issue: Option<IssueSummary>,
    /// Comment attached to the event
    pub comment: Option<CommentThread>,
    /// Field changes carried by update events
    pub changelog: Option<Changelog>,
}

impl IssueEventSummary {
    /// Decodes the projection from a raw payload object.
    pub fn from_object(object: &Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(object.clone()))
    }
}

/// A Jira user reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRef {
    /// Login name
    pub name: Option<String>,
    /// Stable user key
    pub key: Option<String>,
    /// Email address, if visible to the webhook
    pub email_address: Option<String>,
    /// Whether the account is active
    pub active: Option<bool>,
}

/// The issue an event refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueSummary {
    /// Numeric issue id, as a string
    pub id: Option<String>,
    /// REST URL of the issue
    #[serde(rename = "self")]
    pub self_url: Option<String>,
    /// Issue key, e.g. `PROJ-42`
    pub key: Option<String>,
    /// Selected issue fields
    pub fields: Option<IssueFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFields {
    /// Issue type
    pub issuetype: Option<IssueType>,
    /// Owning project
    pub project: Option<ProjectRef>,
    /// Priority
    pub priority: Option<Priority>,
    /// Workflow status
    pub status: Option<Status>,
    /// One-line issue title
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueType {
    /// Issue type id
    pub id: Option<String>,
    /// Issue type description
    pub description: Option<String>,
    /// Display name, e.g. `Bug`
    pub name: Option<String>,
    /// Whether this is a sub-task type
    pub subtask: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRef {
    /// Project id
    pub id: Option<String>,
    /// Project key, e.g. `PROJ`
    pub key: Option<String>,
    /// Project display name
    pub name: Option<String>,
    /// Project type, e.g. `software`
    pub project_type_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Priority {
    /// Display name, e.g. `Major`
    pub name: Option<String>,
    /// Priority id
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    /// Status description
    pub description: Option<String>,
    /// Display name, e.g. `In Progress`
    pub name: Option<String>,
    /// Status id
    pub id: Option<String>,
    /// Category the status belongs to
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCategory {
    /// Category id
    pub id: Option<i64>,
    /// Category key: `new`, `indeterminate` or `done`
    pub key: Option<String>,
    /// Category display name
    pub name: Option<String>,
}

/// A comment together with the surrounding comment page, if Jira sent one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentThread {
    /// Comment id
    pub id: Option<String>,
    /// Comment author
    pub author: Option<UserRef>,
    /// Comment text
    pub body: Option<String>,
    /// Last editor
    pub update_author: Option<UserRef>,
    /// Creation time as sent by Jira
    pub created: Option<String>,
    /// Last update time as sent by Jira
    pub updated: Option<String>,
    /// Page of comments; `null` decodes as empty
    #[serde(deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
    /// Page size
    pub max_results: Option<u64>,
    /// Total number of comments on the issue
    pub total: Option<u64>,
    /// Offset of the page
    pub start_at: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    /// Comment id
    pub id: Option<String>,
    /// Comment author
    pub author: Option<UserRef>,
    /// Comment text
    pub body: Option<String>,
    /// Last editor
    pub update_author: Option<UserRef>,
    /// Creation time as sent by Jira
    pub created: Option<String>,
    /// Last update time as sent by Jira
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Changelog {
    /// Changelog id
    pub id: Option<String>,
    /// Changed fields; `null` decodes as empty
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<ChangelogItem>,
}

/// One field change in a changelog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangelogItem {
    /// Name of the changed field
    pub field: Option<String>,
    /// `jira` for system fields, `custom` otherwise
    pub fieldtype: Option<String>,
    /// Raw previous value
    pub from: Option<String>,
    /// Previous value as displayed
    pub from_string: Option<String>,
    /// Raw new value
    pub to: Option<String>,
    /// New value as displayed
    pub to_string: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn missing_fields_decode_as_none() {
        let summary =
            IssueEventSummary::from_object(&object(json!({"webhookEvent": "jira:issue_deleted"})))
                .unwrap();

        assert_eq!(summary.webhook_event.as_deref(), Some("jira:issue_deleted"));
        assert!(summary.user.is_none());
        assert!(summary.issue.is_none());
        assert!(summary.changelog.is_none());
    }

    #[test]
    fn null_nested_objects_decode_as_none() {
        let summary = IssueEventSummary::from_object(&object(json!({
            "webhookEvent": "jira:issue_updated",
            "user": null,
            "issue": {"key": "PROJ-9", "fields": {"status": null}}
        })))
        .unwrap();

        assert!(summary.user.is_none());
        let issue = summary.issue.unwrap();
        assert_eq!(issue.key.as_deref(), Some("PROJ-9"));
        assert!(issue.fields.unwrap().status.is_none());
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let summary = IssueEventSummary::from_object(&object(json!({
            "webhookEvent": "jira:issue_updated",
            "comment": {"id": "1", "comments": null},
            "changelog": {"id": "2", "items": null}
        })))
        .unwrap();

        let comment = summary.comment.unwrap();
        assert_eq!(comment.id.as_deref(), Some("1"));
        assert!(comment.comments.is_empty());
        assert!(summary.changelog.unwrap().items.is_empty());
    }

    #[test]
    fn decodes_comment_thread_and_changelog() {
        let summary = IssueEventSummary::from_object(&object(json!({
            "webhookEvent": "jira:issue_updated",
            "issue_event_type_name": "issue_commented",
            "comment": {
                "id": "100",
                "body": "looks good",
                "author": {"name": "alice", "active": true},
                "comments": [{"id": "99", "body": "first"}],
                "total": 2
            },
            "changelog": {
                "id": "5",
                "items": [{"field": "status", "fromString": "Open", "toString": "Done", "from": null}]
            }
        })))
        .unwrap();

        assert_eq!(summary.issue_event_type_name.as_deref(), Some("issue_commented"));
        let comment = summary.comment.unwrap();
        assert_eq!(comment.author.unwrap().name.as_deref(), Some("alice"));
        assert_eq!(comment.comments.len(), 1);
        assert_eq!(comment.total, Some(2));

        let item = &summary.changelog.unwrap().items[0];
        assert_eq!(item.from_string.as_deref(), Some("Open"));
        assert_eq!(item.to_string.as_deref(), Some("Done"));
        assert!(item.from.is_none());
    }

    #[test]
    fn incompatible_types_are_reported() {
        let result = IssueEventSummary::from_object(&object(json!({
            "webhookEvent": "jira:issue_updated",
            "timestamp": "yesterday"
        })));
        assert!(result.is_err());
    }
}
