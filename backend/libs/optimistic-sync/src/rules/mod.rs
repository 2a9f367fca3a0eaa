//! Per-action update rules
//!
//! A rule names the keys an action touches and how each value changes.
//! Transforms are pure: they run inside the cache's write lock and never
//! perform I/O. Keys that are not materialized are skipped.

mod comment;
mod notification;
mod post;
mod profile;
mod toggle;

pub use comment::{CommentCreateRule, CommentDeleteRule};
pub use notification::{MarkAllNotificationsRule, MarkNotificationRule};
pub use post::{PostCreateRule, PostDeleteRule};
pub use profile::ProfileUpdateRule;
pub use toggle::{BookmarkToggleRule, FollowToggleRule, LikeToggleRule};

use crate::action::{ActionKind, SyncAction};
use crate::error::{SyncError, SyncResult};
use crate::models::{fields, toggle_counter};
use crate::transport::MutationResponse;
use query_cache::{CacheKey, InfiniteData, KeySelector, Page, QueryCache};
use serde_json::Value;

/// Keys an action touches: standalone records plus collection selectors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyPlan {
    pub exact: Vec<CacheKey>,
    pub collections: Vec<KeySelector>,
}

impl KeyPlan {
    pub fn new(exact: Vec<CacheKey>, collections: Vec<KeySelector>) -> Self {
        Self { exact, collections }
    }

    /// One selector covering the whole plan
    pub fn selector(&self) -> KeySelector {
        KeySelector::Any(
            self.exact
                .iter()
                .cloned()
                .map(KeySelector::Exact)
                .chain(self.collections.iter().cloned())
                .collect(),
        )
    }
}

pub trait UpdateRule: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn plan(&self) -> KeyPlan;

    /// Transform one materialized value; returns whether it changed
    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool>;

    /// Fold the server's answer into the cache after success
    fn merge(&self, _response: &MutationResponse, _cache: &QueryCache) -> SyncResult<()> {
        Ok(())
    }
}

pub fn rule_for(action: &SyncAction) -> Box<dyn UpdateRule> {
    match action {
        SyncAction::FollowToggle {
            user_id,
            currently_following,
        } => Box::new(FollowToggleRule::new(user_id, !currently_following)),
        SyncAction::LikeToggle {
            post_id,
            currently_liked,
        } => Box::new(LikeToggleRule::new(post_id, !currently_liked)),
        SyncAction::BookmarkToggle {
            post_id,
            currently_bookmarked,
        } => Box::new(BookmarkToggleRule::new(post_id, !currently_bookmarked)),
        SyncAction::CommentCreate(input) => Box::new(CommentCreateRule::new(input)),
        SyncAction::CommentDelete {
            comment_id,
            post_id,
        } => Box::new(CommentDeleteRule::new(comment_id, post_id)),
        SyncAction::NotificationMarkOne { notification_id } => {
            Box::new(MarkNotificationRule::new(notification_id))
        }
        SyncAction::NotificationMarkAll => Box::new(MarkAllNotificationsRule),
        SyncAction::ProfileUpdate(input) => Box::new(ProfileUpdateRule::new(input)),
        SyncAction::PostCreate(input) => Box::new(PostCreateRule::new(input)),
        SyncAction::PostDelete { post_id } => Box::new(PostDeleteRule::new(post_id)),
    }
}

// Rules edit the cached JSON in place. Fields outside the record models and
// records that would not decode as a model are carried through untouched.

fn pages_mut(value: &mut Value) -> SyncResult<&mut Vec<Value>> {
    value
        .get_mut("pages")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SyncError::Malformed("expected a paginated collection".to_string()))
}

/// Standalone record value (like, bookmark, follower, unread count)
pub(crate) fn record_mut(value: &mut Value) -> SyncResult<&mut Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(SyncError::Malformed("expected a record".to_string()))
    }
}

pub(crate) fn record_id(record: &Value) -> Option<&str> {
    record.get(fields::ID).and_then(Value::as_str)
}

/// Run `f` on every record of a paginated collection
pub(crate) fn edit_records<F>(value: &mut Value, mut f: F) -> SyncResult<bool>
where
    F: FnMut(&mut Value) -> bool,
{
    let mut changed = false;
    for page in pages_mut(value)? {
        if let Some(records) = page.get_mut("records").and_then(Value::as_array_mut) {
            for record in records {
                changed |= f(record);
            }
        }
    }
    Ok(changed)
}

/// Drop every record matching the predicate; returns whether any was removed
pub(crate) fn remove_records<F>(value: &mut Value, mut predicate: F) -> SyncResult<bool>
where
    F: FnMut(&Value) -> bool,
{
    let mut removed = false;
    for page in pages_mut(value)? {
        if let Some(records) = page.get_mut("records").and_then(Value::as_array_mut) {
            let before = records.len();
            records.retain(|record| !predicate(record));
            removed |= records.len() != before;
        }
    }
    Ok(removed)
}

/// Insert a record at the head of the first page
pub(crate) fn prepend_record(value: &mut Value, record: Value) -> SyncResult<()> {
    if pages_mut(value)?.is_empty() {
        *value = serde_json::to_value(InfiniteData::first(Page::new(vec![record], None)))?;
        return Ok(());
    }
    let records = pages_mut(value)?
        .first_mut()
        .and_then(|page| page.get_mut("records"))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| SyncError::Malformed("first page has no records".to_string()))?;
    records.insert(0, record);
    Ok(())
}

/// Replace the record with id `id` wherever it appears
pub(crate) fn replace_record(value: &mut Value, id: &str, replacement: &Value) -> SyncResult<bool> {
    edit_records(value, |record| {
        if record_id(record) != Some(id) {
            return false;
        }
        *record = replacement.clone();
        true
    })
}

/// Set a flag and move its paired counter by one; other fields stay as they are
pub(crate) fn toggle_fields(record: &mut Value, flag: &str, count: &str, target: bool) -> bool {
    let Some(object) = record.as_object_mut() else {
        return false;
    };
    let mut current = object.get(flag).and_then(Value::as_bool).unwrap_or(false);
    let mut counter = object.get(count).and_then(Value::as_u64).unwrap_or(0);
    toggle_counter(&mut current, &mut counter, target);
    object.insert(flag.to_string(), Value::Bool(current));
    object.insert(count.to_string(), Value::from(counter));
    true
}

/// Move a counter by one in either direction, flooring at zero
pub(crate) fn step_count(record: &mut Value, count: &str, up: bool) -> bool {
    let Some(object) = record.as_object_mut() else {
        return false;
    };
    let current = object.get(count).and_then(Value::as_u64).unwrap_or(0);
    let next = if up {
        current.saturating_add(1)
    } else {
        current.saturating_sub(1)
    };
    object.insert(count.to_string(), Value::from(next));
    true
}

pub(crate) fn set_field(record: &mut Value, field: &str, value: Value) -> bool {
    match record.as_object_mut() {
        Some(object) => {
            object.insert(field.to_string(), value);
            true
        }
        None => false,
    }
}
