//! Profile edits propagate to every embedded author summary

use super::{edit_records, record_id, KeyPlan, UpdateRule};
use crate::action::{ActionKind, ProfileInput};
use crate::error::SyncResult;
use crate::models::fields;
use crate::transport::MutationResponse;
use query_cache::{family, CacheKey, KeySelector, QueryCache};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
struct ProfilePatch {
    display_name: String,
    bio: Option<String>,
    avatar_url: Option<String>,
}

impl ProfilePatch {
    /// Rewrite the embedded author of `record` when it is `user_id`
    fn apply_to(&self, user_id: &str, record: &mut Value) -> bool {
        let Some(author) = record.get_mut(fields::USER) else {
            return false;
        };
        if record_id(author) != Some(user_id) {
            return false;
        }
        let Some(author) = author.as_object_mut() else {
            return false;
        };
        author.insert(
            fields::DISPLAY_NAME.to_string(),
            Value::from(self.display_name.clone()),
        );
        author.insert(fields::BIO.to_string(), Value::from(self.bio.clone()));
        if let Some(avatar_url) = &self.avatar_url {
            author.insert(fields::AVATAR_URL.to_string(), Value::from(avatar_url.clone()));
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ProfileUpdateRule {
    user_id: String,
    patch: ProfilePatch,
}

impl ProfileUpdateRule {
    pub fn new(input: &ProfileInput) -> Self {
        Self {
            user_id: input.user_id.clone(),
            patch: ProfilePatch {
                display_name: input.display_name.trim().to_string(),
                bio: input.bio.clone(),
                avatar_url: input.avatar_url.clone(),
            },
        }
    }

    fn rewrite(
        user_id: &str,
        patch: &ProfilePatch,
        key: &CacheKey,
        value: &mut Value,
    ) -> SyncResult<bool> {
        match key.family() {
            Some(family::POST_FEED) | Some(family::COMMENT_FEED) => {
                edit_records(value, |record| patch.apply_to(user_id, record))
            }
            _ => Ok(false),
        }
    }
}

impl UpdateRule for ProfileUpdateRule {
    fn kind(&self) -> ActionKind {
        ActionKind::ProfileUpdate
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![],
            vec![
                KeySelector::prefix(CacheKey::post_feed()),
                KeySelector::prefix(CacheKey::root(family::COMMENT_FEED)),
            ],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        Self::rewrite(&self.user_id, &self.patch, key, value)
    }

    fn merge(&self, response: &MutationResponse, cache: &QueryCache) -> SyncResult<()> {
        let MutationResponse::User(user) = response else {
            return Ok(());
        };

        let patch = ProfilePatch {
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
        };
        cache.update_where(&self.plan().selector(), |key, value| {
            Self::rewrite(&user.id, &patch, key, value)
        })?;
        Ok(())
    }
}
