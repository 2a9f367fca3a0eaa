//! Notification read state

use super::{record_id, record_mut, remove_records, set_field, step_count, KeyPlan, UpdateRule};
use crate::action::ActionKind;
use crate::error::SyncResult;
use crate::models::{fields, NotificationRecord, UnreadCount};
use query_cache::{family, CacheKey, InfiniteData};
use serde_json::Value;

/// Drops one notification from the unread feed and decrements the count
#[derive(Debug, Clone)]
pub struct MarkNotificationRule {
    notification_id: String,
}

impl MarkNotificationRule {
    pub fn new(notification_id: &str) -> Self {
        Self {
            notification_id: notification_id.to_string(),
        }
    }
}

impl UpdateRule for MarkNotificationRule {
    fn kind(&self) -> ActionKind {
        ActionKind::NotificationMarkOne
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![
                CacheKey::notifications_feed(),
                CacheKey::unread_notifications_count(),
            ],
            vec![],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::NOTIFICATIONS_FEED) => remove_records(value, |notification| {
                record_id(notification) == Some(self.notification_id.as_str())
            }),
            Some(family::UNREAD_NOTIFICATIONS) => Ok(step_count(
                record_mut(value)?,
                fields::UNREAD_COUNT,
                false,
            )),
            _ => Ok(false),
        }
    }
}

/// Replaces the unread feed with one empty page and zeroes the count
#[derive(Debug, Clone, Copy)]
pub struct MarkAllNotificationsRule;

impl UpdateRule for MarkAllNotificationsRule {
    fn kind(&self) -> ActionKind {
        ActionKind::NotificationMarkAll
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![
                CacheKey::notifications_feed(),
                CacheKey::unread_notifications_count(),
            ],
            vec![],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::NOTIFICATIONS_FEED) => {
                *value = serde_json::to_value(InfiniteData::<NotificationRecord>::empty())?;
                Ok(true)
            }
            Some(family::UNREAD_NOTIFICATIONS) if value.is_object() => {
                Ok(set_field(value, fields::UNREAD_COUNT, Value::from(0u64)))
            }
            Some(family::UNREAD_NOTIFICATIONS) => {
                *value = serde_json::to_value(UnreadCount { unread_count: 0 })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
