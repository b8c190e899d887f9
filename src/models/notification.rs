use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{NotificationType, Priority, RelatedEventType};

/// Display entity shown in the patient's notification feed.
///
/// Generated items are never stored; their `id` is derived from the source
/// entity id plus a qualifier so regeneration is idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub timestamp: NaiveDateTime,
    pub priority: Priority,
    pub is_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

/// A notification row owned by the remote feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNotification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: Priority,
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_type: Option<RelatedEventType>,
}

impl From<RemoteNotification> for Notification {
    fn from(remote: RemoteNotification) -> Self {
        Self {
            id: remote.id,
            title: remote.title,
            message: remote.message,
            kind: remote.kind,
            timestamp: remote.timestamp,
            priority: remote.priority,
            is_generated: false,
            action_url: remote.action_url,
        }
    }
}

/// Insert payload for the remote feed. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRemoteNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_event_type: Option<RelatedEventType>,
}

/// Snapshot exposed to consumers of the notification center.
///
/// There is no read sub-state: everything still listed counts as unread,
/// so `unread_count == total_count == notifications.len()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub total_count: usize,
    pub loading: bool,
}

impl NotificationSummary {
    pub fn from_list(notifications: Vec<Notification>) -> Self {
        let count = notifications.len();
        Self {
            notifications,
            unread_count: count,
            total_count: count,
            loading: false,
        }
    }

    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn remote_converts_to_non_generated() {
        let remote = RemoteNotification {
            id: "r1".into(),
            user_id: "u1".into(),
            title: "New Appointment Scheduled".into(),
            message: "Dentist".into(),
            kind: NotificationType::Reminder,
            priority: Priority::High,
            timestamp: ts(),
            action_url: Some("/calendar".into()),
            related_event_id: Some("a1".into()),
            related_event_type: Some(RelatedEventType::Appointment),
        };
        let n = Notification::from(remote);
        assert_eq!(n.id, "r1");
        assert!(!n.is_generated);
        assert_eq!(n.action_url.as_deref(), Some("/calendar"));
    }

    #[test]
    fn summary_counts_everything_as_unread() {
        let n = Notification {
            id: "x".into(),
            title: "t".into(),
            message: "m".into(),
            kind: NotificationType::Info,
            timestamp: ts(),
            priority: Priority::Low,
            is_generated: true,
            action_url: None,
        };
        let summary = NotificationSummary::from_list(vec![n.clone(), n]);
        assert_eq!(summary.unread_count, 2);
        assert_eq!(summary.total_count, 2);
        assert!(!summary.loading);
    }

    #[test]
    fn serializes_with_camel_case_and_type() {
        let n = Notification {
            id: "x".into(),
            title: "t".into(),
            message: "m".into(),
            kind: NotificationType::Warning,
            timestamp: ts(),
            priority: Priority::Medium,
            is_generated: true,
            action_url: None,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "warning");
        assert_eq!(value["isGenerated"], true);
        assert!(value.get("actionUrl").is_none());
    }
}
