//! Comment creation and deletion

use super::{
    edit_records, prepend_record, record_id, remove_records, replace_record, step_count,
    KeyPlan, UpdateRule,
};
use crate::action::{ActionKind, CommentInput};
use crate::error::SyncResult;
use crate::models::{fields, optimistic_id, CommentRecord};
use crate::transport::MutationResponse;
use chrono::Utc;
use query_cache::{family, CacheKey, KeySelector, QueryCache};
use serde_json::Value;

/// Prepends a placeholder comment and bumps the post's `commentCount`.
/// On success the placeholder is swapped for the server record.
#[derive(Debug, Clone)]
pub struct CommentCreateRule {
    placeholder: CommentRecord,
}

impl CommentCreateRule {
    pub fn new(input: &CommentInput) -> Self {
        Self {
            placeholder: CommentRecord {
                id: optimistic_id(),
                post_id: input.post_id.clone(),
                content: input.content.trim().to_string(),
                created_at: Utc::now(),
                user: input.author.clone(),
            },
        }
    }

    pub fn placeholder(&self) -> &CommentRecord {
        &self.placeholder
    }
}

impl UpdateRule for CommentCreateRule {
    fn kind(&self) -> ActionKind {
        ActionKind::CommentCreate
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![CacheKey::comment_feed(&self.placeholder.post_id)],
            vec![KeySelector::prefix(CacheKey::post_feed())],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::COMMENT_FEED) => {
                prepend_record(value, serde_json::to_value(&self.placeholder)?)?;
                Ok(true)
            }
            Some(family::POST_FEED) => edit_records(value, |post| {
                record_id(post) == Some(self.placeholder.post_id.as_str())
                    && step_count(post, fields::COMMENT_COUNT, true)
            }),
            _ => Ok(false),
        }
    }

    fn merge(&self, response: &MutationResponse, cache: &QueryCache) -> SyncResult<()> {
        let MutationResponse::Comment(created) = response else {
            return Ok(());
        };

        let created = serde_json::to_value(created)?;
        let key = CacheKey::comment_feed(&self.placeholder.post_id);
        cache.update_where(&KeySelector::exact(key), |_, value| {
            replace_record(value, &self.placeholder.id, &created)
        })?;
        Ok(())
    }
}

/// Removes the comment and decrements the post's `commentCount`
#[derive(Debug, Clone)]
pub struct CommentDeleteRule {
    comment_id: String,
    post_id: String,
}

impl CommentDeleteRule {
    pub fn new(comment_id: &str, post_id: &str) -> Self {
        Self {
            comment_id: comment_id.to_string(),
            post_id: post_id.to_string(),
        }
    }
}

impl UpdateRule for CommentDeleteRule {
    fn kind(&self) -> ActionKind {
        ActionKind::CommentDelete
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![CacheKey::comment_feed(&self.post_id)],
            vec![KeySelector::prefix(CacheKey::post_feed())],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::COMMENT_FEED) => {
                remove_records(value, |comment| {
                    record_id(comment) == Some(self.comment_id.as_str())
                })
            }
            Some(family::POST_FEED) => edit_records(value, |post| {
                record_id(post) == Some(self.post_id.as_str())
                    && step_count(post, fields::COMMENT_COUNT, false)
            }),
            _ => Ok(false),
        }
    }
}
