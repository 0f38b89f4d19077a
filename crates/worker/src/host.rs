//! The worker's view of the platform around it: controlled pages and the
//! notification surface.

use serde::{Deserialize, Serialize};
use sitecache_core::Error;
use url::Url;

const NOTIFICATION_TITLE: &str = "ThinkBit Edge Corp";
const NOTIFICATION_BODY: &str = "New updates available from ThinkBit Edge!";
const NOTIFICATION_ICON: &str = "/assets/images/icon-192x192.png";
const NOTIFICATION_BADGE: &str = "/assets/images/badge-72x72.png";
const VIBRATE_PATTERN: &[u32] = &[100, 50, 100];

/// Action id that opens the site root when clicked.
pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";

/// Operations the worker asks of its host.
#[async_trait::async_trait]
pub trait ClientHost: Send + Sync {
    /// Take control of every open page in scope.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Dismiss the notification the user interacted with.
    async fn close_notification(&self) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl Notification {
    /// The fixed "updates available" notification shown on every push.
    pub fn site_update(now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            title: NOTIFICATION_TITLE.into(),
            body: NOTIFICATION_BODY.into(),
            icon: NOTIFICATION_ICON.into(),
            badge: NOTIFICATION_BADGE.into(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData { date_of_arrival: now.timestamp_millis(), primary_key: 1 },
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.into(),
                    title: "Explore".into(),
                    icon: "/assets/images/checkmark.png".into(),
                },
                NotificationAction {
                    action: CLOSE_ACTION.into(),
                    title: "Close".into(),
                    icon: "/assets/images/xmark.png".into(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_site_update_notification() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let notification = Notification::site_update(now);

        assert_eq!(notification.title, "ThinkBit Edge Corp");
        assert_eq!(notification.vibrate, vec![100, 50, 100]);
        assert_eq!(notification.data.date_of_arrival, now.timestamp_millis());
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["explore", "close"]);
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let value = serde_json::to_value(Notification::site_update(chrono::Utc::now())).unwrap();
        assert_eq!(value["data"]["primaryKey"], 1);
        assert!(value["data"]["dateOfArrival"].is_i64());
        assert_eq!(value["badge"], "/assets/images/badge-72x72.png");
    }
}
