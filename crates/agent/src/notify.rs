//! Push payload parsing and notification construction.
//!
//! A push payload is application JSON; anything malformed falls back to a
//! generic notification rather than failing the push event.

use serde::{Deserialize, Serialize};

pub const ACTION_OPEN: &str = "open";
pub const ACTION_DISMISS: &str = "dismiss";

const DEFAULT_TITLE: &str = "bivvy";
const DEFAULT_BODY: &str = "You have a new message";
const DEFAULT_ICON: &str = "/icon-192.png";

/// The JSON shape an application push carries. Every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
}

/// A button on a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification the host is asked to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// URL to open when the notification body is activated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub actions: Vec<NotificationAction>,
    pub require_interaction: bool,
    pub vibrate: Vec<u32>,
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction { action: ACTION_OPEN.to_string(), title: "Open app".to_string() },
        NotificationAction { action: ACTION_DISMISS.to_string(), title: "Dismiss".to_string() },
    ]
}

impl Notification {
    fn from_payload(payload: PushPayload) -> Self {
        Self {
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
            image: payload.image,
            data: payload.url,
            actions: default_actions(),
            require_interaction: true,
            vibrate: vec![200, 100, 200],
        }
    }

    /// Build the notification for a raw push payload. Malformed JSON is
    /// caught and defaulted, never propagated.
    pub fn from_push(raw: &str) -> Self {
        let payload = match serde_json::from_str::<PushPayload>(raw) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("malformed push payload ({err}); showing generic notification");
                PushPayload::default()
            }
        };
        Self::from_payload(payload)
    }

    /// Notification shown after a successful background sync drain.
    pub fn sync_complete() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: "Your data has been synchronized".to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_ICON.to_string(),
            image: None,
            data: None,
            actions: Vec::new(),
            require_interaction: false,
            vibrate: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let raw = r#"{"title":"Reminder","body":"Take your medication","image":"/med.png","url":"/reminders"}"#;
        let notification = Notification::from_push(raw);
        assert_eq!(notification.title, "Reminder");
        assert_eq!(notification.body, "Take your medication");
        assert_eq!(notification.image.as_deref(), Some("/med.png"));
        assert_eq!(notification.data.as_deref(), Some("/reminders"));
        assert_eq!(notification.actions.len(), 2);
        assert!(notification.require_interaction);
    }

    #[test]
    fn test_partial_payload_defaults() {
        let notification = Notification::from_push(r#"{"title":"Only a title"}"#);
        assert_eq!(notification.title, "Only a title");
        assert_eq!(notification.body, DEFAULT_BODY);
        assert!(notification.image.is_none());
    }

    #[test]
    fn test_malformed_payload_is_generic() {
        let notification = Notification::from_push("{not json");
        assert_eq!(notification.title, DEFAULT_TITLE);
        assert_eq!(notification.body, DEFAULT_BODY);
        assert_eq!(notification.actions.len(), 2);
    }

    #[test]
    fn test_action_ids() {
        let notification = Notification::from_push("{}");
        let ids: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(ids, vec![ACTION_OPEN, ACTION_DISMISS]);
    }
}
