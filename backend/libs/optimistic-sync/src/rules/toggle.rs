//! Flag + counter toggles: like, bookmark, follow

use super::{
    edit_records, record_id, record_mut, remove_records, set_field, toggle_fields, KeyPlan,
    UpdateRule,
};
use crate::action::ActionKind;
use crate::error::SyncResult;
use crate::models::fields;
use query_cache::{family, CacheKey, KeySelector};
use serde_json::Value;

/// Sets `isLikedByUser` and moves `likesCount` on the like record and on
/// every feed copy of the post
#[derive(Debug, Clone)]
pub struct LikeToggleRule {
    post_id: String,
    liked: bool,
}

impl LikeToggleRule {
    pub fn new(post_id: &str, liked: bool) -> Self {
        Self {
            post_id: post_id.to_string(),
            liked,
        }
    }
}

impl UpdateRule for LikeToggleRule {
    fn kind(&self) -> ActionKind {
        ActionKind::LikeToggle
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![CacheKey::like_data(&self.post_id)],
            vec![KeySelector::prefix(CacheKey::post_feed())],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::LIKE_DATA) => Ok(toggle_fields(
                record_mut(value)?,
                fields::IS_LIKED_BY_USER,
                fields::LIKES_COUNT,
                self.liked,
            )),
            Some(family::POST_FEED) => edit_records(value, |post| {
                record_id(post) == Some(self.post_id.as_str())
                    && toggle_fields(
                        post,
                        fields::IS_LIKED_BY_USER,
                        fields::LIKE_COUNT,
                        self.liked,
                    )
            }),
            _ => Ok(false),
        }
    }
}

/// Sets `isBookmarkedByUser`; unbookmarking also drops the post from the
/// bookmarks feed
#[derive(Debug, Clone)]
pub struct BookmarkToggleRule {
    post_id: String,
    bookmarked: bool,
}

impl BookmarkToggleRule {
    pub fn new(post_id: &str, bookmarked: bool) -> Self {
        Self {
            post_id: post_id.to_string(),
            bookmarked,
        }
    }
}

impl UpdateRule for BookmarkToggleRule {
    fn kind(&self) -> ActionKind {
        ActionKind::BookmarkToggle
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![CacheKey::bookmark_data(&self.post_id)],
            vec![KeySelector::prefix(CacheKey::post_feed())],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::BOOKMARK_DATA) => Ok(set_field(
                record_mut(value)?,
                fields::IS_BOOKMARKED_BY_USER,
                Value::Bool(self.bookmarked),
            )),
            Some(family::POST_FEED) if !self.bookmarked && key == &CacheKey::bookmarks_feed() => {
                remove_records(value, |post| record_id(post) == Some(self.post_id.as_str()))
            }
            Some(family::POST_FEED) => edit_records(value, |post| {
                record_id(post) == Some(self.post_id.as_str())
                    && set_field(
                        post,
                        fields::IS_BOOKMARKED_BY_USER,
                        Value::Bool(self.bookmarked),
                    )
            }),
            _ => Ok(false),
        }
    }
}

/// Sets `isFollowedByUser` and moves `followerCount` on the follower record
/// and on the author summary embedded in feed posts
#[derive(Debug, Clone)]
pub struct FollowToggleRule {
    user_id: String,
    following: bool,
}

impl FollowToggleRule {
    pub fn new(user_id: &str, following: bool) -> Self {
        Self {
            user_id: user_id.to_string(),
            following,
        }
    }
}

impl UpdateRule for FollowToggleRule {
    fn kind(&self) -> ActionKind {
        ActionKind::FollowToggle
    }

    fn plan(&self) -> KeyPlan {
        KeyPlan::new(
            vec![CacheKey::follower_data(&self.user_id)],
            vec![KeySelector::prefix(CacheKey::post_feed())],
        )
    }

    fn apply(&self, key: &CacheKey, value: &mut Value) -> SyncResult<bool> {
        match key.family() {
            Some(family::FOLLOWER_DATA) => Ok(toggle_fields(
                record_mut(value)?,
                fields::IS_FOLLOWED_BY_USER,
                fields::FOLLOWER_COUNT,
                self.following,
            )),
            Some(family::POST_FEED) => edit_records(value, |post| {
                let Some(author) = post.get_mut(fields::USER) else {
                    return false;
                };
                record_id(author) == Some(self.user_id.as_str())
                    && toggle_fields(
                        author,
                        fields::IS_FOLLOWED_BY_USER,
                        fields::FOLLOWER_COUNT,
                        self.following,
                    )
            }),
            _ => Ok(false),
        }
    }
}
