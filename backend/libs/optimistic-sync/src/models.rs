//! Records held in the client cache
//!
//! Field names follow the JSON the API serves (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of ids assigned to records created optimistically
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

pub fn optimistic_id() -> String {
    format!("{}{}", OPTIMISTIC_ID_PREFIX, Uuid::new_v4())
}

pub fn is_optimistic_id(id: &str) -> bool {
    id.starts_with(OPTIMISTIC_ID_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub post_count: u64,
    #[serde(default)]
    pub is_followed_by_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub is_liked_by_user: bool,
    #[serde(default)]
    pub is_bookmarked_by_user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIssuer {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub issuer: NotificationIssuer,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeInfo {
    pub likes_count: u64,
    pub is_liked_by_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkInfo {
    pub is_bookmarked_by_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerInfo {
    pub follower_count: u64,
    pub is_followed_by_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: u64,
}

/// JSON field names the update rules edit in place
pub(crate) mod fields {
    pub const ID: &str = "id";
    pub const USER: &str = "user";
    pub const LIKES_COUNT: &str = "likesCount";
    pub const LIKE_COUNT: &str = "likeCount";
    pub const COMMENT_COUNT: &str = "commentCount";
    pub const FOLLOWER_COUNT: &str = "followerCount";
    pub const UNREAD_COUNT: &str = "unreadCount";
    pub const IS_LIKED_BY_USER: &str = "isLikedByUser";
    pub const IS_BOOKMARKED_BY_USER: &str = "isBookmarkedByUser";
    pub const IS_FOLLOWED_BY_USER: &str = "isFollowedByUser";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const BIO: &str = "bio";
    pub const AVATAR_URL: &str = "avatarUrl";
}

/// Move a flag to `target` and its paired counter by exactly one.
/// The counter never goes below zero.
pub(crate) fn toggle_counter(flag: &mut bool, count: &mut u64, target: bool) {
    *flag = target;
    *count = if target {
        count.saturating_add(1)
    } else {
        count.saturating_sub(1)
    };
}
