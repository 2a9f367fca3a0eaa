//! Post creation and deletion

use super::{prepend_record, record_id, remove_records, replace_record, KeyPlan, UpdateRule};
use crate::action::{ActionKind, PostInput};
use crate::error::SyncResult;
use crate::models::{optimistic_id, PostRecord};
use crate::transport::MutationResponse;
use chrono::Utc;
use query_cache::{family, CacheKey, KeySelector, QueryCache};
use serde_json::Value;

/// Prepends a placeholder post to the for-you feed and the author's own
/// feed; the server record replaces it on success
#[derive(Debug, Clone)]
pub struct PostCreateRule {
    placeholder: PostRecord,
}

impl PostCreateRule {
    pub fn new(input: &PostInput) -> Self {
        Self {
            placeholder: PostRecord {
                id: optimistic_id(),
                content: input.content.trim().to_string(),
                created_at: Utc::now(),
                user: input.author.clone(),
                attachments: Vec::new(),
                like_count: 0,
                comment_count: 0,
                is_liked_by_user: false,
                is_bookmarked_by_user: false,
            },
        }
    }

    pub fn placeholder(&self) -> &PostRecord {
        &self.placeholder
    }
}

impl UpdateRule for PostCreateRule {
    fn kind(&self) -> ActionKind {
        ActionKind::PostCreate
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![],
            vec![
                KeySelector::exact(CacheKey::for_you_feed()),
                KeySelector::exact(CacheKey::user_posts_feed(&self.placeholder.user.id)),
            ],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        if key.family() != Some(family::POST_FEED) {
            return Ok(false);
        }
        prepend_record(value, serde_json::to_value(&self.placeholder)?)?;
        Ok(true)
    }

    fn merge(&self, response: &MutationResponse, cache: &QueryCache) -> SyncResult<()> {
        let MutationResponse::Post(created) = response else {
            return Ok(());
        };

        let created = serde_json::to_value(created)?;
        cache.update_where(&KeySelector::prefix(CacheKey::post_feed()), |_, value| {
            replace_record(value, &self.placeholder.id, &created)
        })?;
        Ok(())
    }
}

/// Removes the post from every post feed
#[derive(Debug, Clone)]
pub struct PostDeleteRule {
    post_id: String,
}

impl PostDeleteRule {
    pub fn new(post_id: &str) -> Self {
        Self {
            post_id: post_id.to_string(),
        }
    }
}

impl UpdateRule for PostDeleteRule {
    fn kind(&self) -> ActionKind {
        ActionKind::PostDelete
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(vec![], vec![KeySelector::prefix(CacheKey::post_feed())])
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        if key.family() != Some(family::POST_FEED) {
            return Ok(false);
        }
        remove_records(value, |post| record_id(post) == Some(self.post_id.as_str()))
    }
}
