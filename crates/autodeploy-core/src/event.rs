//! Push events received from GitHub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EventId, ParseError};

/// The only event type that can lead to a deploy.
pub const PUSH_EVENT_TYPE: &str = "push";

/// Repository a push was made to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Who pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pusher {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Push delivery body as GitHub sends it.
#[derive(Debug, Deserialize)]
struct PushPayload {
    r#ref: String,
    repository: RepositoryInfo,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    pusher: Option<Pusher>,
    #[serde(flatten)]
    upstream: Map<String, Value>,
}

/// A parsed push notification.
///
/// Only `repository.name` and `ref` drive decisions; everything else GitHub
/// sent is kept untouched in `upstream`.
#[derive(Debug, Clone, Serialize)]
pub struct PushEvent {
    pub id: EventId,
    /// Value of `X-GitHub-Delivery`, when the sender supplied one.
    pub delivery: Option<String>,
    pub received_at: DateTime<Utc>,
    pub r#ref: String,
    pub repository: RepositoryInfo,
    pub after: Option<String>,
    pub pusher: Option<Pusher>,
    pub upstream: Map<String, Value>,
}

impl PushEvent {
    pub fn repository_name(&self) -> &str {
        &self.repository.name
    }

    /// First seven characters of the head commit, for log lines.
    pub fn short_sha(&self) -> Option<&str> {
        self.after.as_deref().map(|sha| sha.get(..7).unwrap_or(sha))
    }

    pub fn pusher_name(&self) -> &str {
        self.pusher.as_ref().map_or("unknown", |p| p.name.as_str())
    }
}

/// Parse a verified webhook body into a push event.
///
/// `event_type` is the `X-GitHub-Event` header; anything other than `push`
/// (including a missing header) is rejected as unsupported.
pub fn parse_event(
    event_type: Option<&str>,
    body: &[u8],
    delivery: Option<&str>,
) -> Result<PushEvent, ParseError> {
    match event_type {
        Some(PUSH_EVENT_TYPE) => {}
        Some(other) => return Err(ParseError::UnsupportedEventType(other.to_string())),
        None => return Err(ParseError::UnsupportedEventType("unknown".to_string())),
    }

    let payload: PushPayload = serde_json::from_slice(body)?;

    Ok(PushEvent {
        id: EventId::new(),
        delivery: delivery.map(String::from),
        received_at: Utc::now(),
        r#ref: payload.r#ref,
        repository: payload.repository,
        after: payload.after,
        pusher: payload.pusher,
        upstream: payload.upstream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ref": "refs/heads/master",
            "before": "0000000000000000000000000000000000000000",
            "after": "6113728f27ae82c7b1a177c8d03f9e96e0adf246",
            "repository": {
                "id": 1296269,
                "name": "Nettverksdagen-2",
                "full_name": "sigtot/Nettverksdagen-2"
            },
            "pusher": { "name": "sigtot", "email": "sigtot@example.com" },
            "commits": []
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_push_event() {
        let event = parse_event(Some("push"), &push_body(), Some("72d3162e")).unwrap();

        assert_eq!(event.repository_name(), "Nettverksdagen-2");
        assert_eq!(event.r#ref, "refs/heads/master");
        assert_eq!(event.short_sha(), Some("6113728"));
        assert_eq!(event.pusher_name(), "sigtot");
        assert_eq!(event.delivery.as_deref(), Some("72d3162e"));
        assert!(event.upstream.contains_key("before"));
        assert!(event.upstream.contains_key("commits"));
        assert!(!event.upstream.contains_key("ref"));
    }

    #[test]
    fn test_unsupported_event_type() {
        let err = parse_event(Some("ping"), &push_body(), None).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedEventType(ref t) if t == "ping"));

        let err = parse_event(None, &push_body(), None).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedEventType(_)));
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_event(Some("push"), b"not json", None).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));

        let missing_ref = serde_json::to_vec(&json!({ "repository": { "name": "r" } })).unwrap();
        let err = parse_event(Some("push"), &missing_ref, None).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));

        let missing_repo = serde_json::to_vec(&json!({ "ref": "refs/heads/master" })).unwrap();
        let err = parse_event(Some("push"), &missing_repo, None).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));
    }

    #[test]
    fn test_minimal_payload() {
        let body =
            serde_json::to_vec(&json!({ "ref": "refs/heads/x", "repository": { "name": "r" } }))
                .unwrap();
        let event = parse_event(Some("push"), &body, None).unwrap();
        assert_eq!(event.short_sha(), None);
        assert_eq!(event.pusher_name(), "unknown");
        assert!(event.upstream.is_empty());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = parse_event(Some("push"), &push_body(), None).unwrap();
        let b = parse_event(Some("push"), &push_body(), None).unwrap();
        assert_ne!(a.id, b.id);
    }
}
