//! Structured cache keys
//!
//! A key is an ordered tuple of tokens, e.g. `["follower-data", <user_id>]`.
//! Equality is structural. Query families are the leading label token.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Leading labels of every query family the client caches
pub mod family {
    pub const POST_FEED: &str = "post-feed";
    pub const COMMENT_FEED: &str = "comment-feed";
    pub const NOTIFICATIONS_FEED: &str = "notifications-feed";
    pub const LIKE_DATA: &str = "like-data";
    pub const BOOKMARK_DATA: &str = "bookmark-data";
    pub const FOLLOWER_DATA: &str = "follower-data";
    pub const UNREAD_NOTIFICATIONS: &str = "unread-notifications-count";
    pub const UNREAD_MESSAGES: &str = "unread-messages-count";

    /// Sub-labels of the post feed family
    pub const FOR_YOU: &str = "for-you";
    pub const FOLLOWING: &str = "following";
    pub const BOOKMARKS: &str = "bookmarks";
    pub const USER_POSTS: &str = "user-posts";
    pub const SEARCH: &str = "search";

    /// Families whose values are stored as paginated collections
    pub const PAGINATED: [&str; 3] = [POST_FEED, COMMENT_FEED, NOTIFICATIONS_FEED];
}

/// One component of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeyToken {
    /// Static query label (e.g. `post-feed`, `for-you`)
    Label(String),
    /// Dynamic identifier (record id, username, search text)
    Id(String),
}

impl KeyToken {
    pub fn label(value: impl Into<String>) -> Self {
        KeyToken::Label(value.into())
    }

    pub fn id(value: impl Into<String>) -> Self {
        KeyToken::Id(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyToken::Label(s) | KeyToken::Id(s) => s,
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured identifier for one cached query result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(Vec<KeyToken>);

impl CacheKey {
    pub fn new(tokens: Vec<KeyToken>) -> Self {
        Self(tokens)
    }

    /// Single-label key, also used as a family prefix
    pub fn root(label: &str) -> Self {
        Self(vec![KeyToken::label(label)])
    }

    /// Append a token
    pub fn with(mut self, token: KeyToken) -> Self {
        self.0.push(token);
        self
    }

    pub fn tokens(&self) -> &[KeyToken] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Query family (leading label), used for metric labels
    pub fn family(&self) -> Option<&str> {
        match self.0.first() {
            Some(KeyToken::Label(label)) => Some(label),
            _ => None,
        }
    }

    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn contains(&self, token: &KeyToken) -> bool {
        self.0.contains(token)
    }

    /// Whether values under this key are stored as `InfiniteData`
    pub fn is_paginated(&self) -> bool {
        self.family()
            .map(|f| family::PAGINATED.contains(&f))
            .unwrap_or(false)
    }

    // ============= Post feeds =============

    /// Prefix shared by every post feed
    pub fn post_feed() -> Self {
        Self::root(family::POST_FEED)
    }

    pub fn for_you_feed() -> Self {
        Self::post_feed().with(KeyToken::label(family::FOR_YOU))
    }

    pub fn following_feed() -> Self {
        Self::post_feed().with(KeyToken::label(family::FOLLOWING))
    }

    pub fn bookmarks_feed() -> Self {
        Self::post_feed().with(KeyToken::label(family::BOOKMARKS))
    }

    pub fn user_posts_feed(user_id: &str) -> Self {
        Self::post_feed()
            .with(KeyToken::label(family::USER_POSTS))
            .with(KeyToken::id(user_id))
    }

    pub fn search_feed(query: &str) -> Self {
        Self::post_feed()
            .with(KeyToken::label(family::SEARCH))
            .with(KeyToken::id(query))
    }

    // ============= Other collections =============

    pub fn comment_feed(post_id: &str) -> Self {
        Self::root(family::COMMENT_FEED).with(KeyToken::id(post_id))
    }

    pub fn notifications_feed() -> Self {
        Self::root(family::NOTIFICATIONS_FEED)
    }

    // ============= Single records =============

    pub fn like_data(post_id: &str) -> Self {
        Self::root(family::LIKE_DATA).with(KeyToken::id(post_id))
    }

    pub fn bookmark_data(post_id: &str) -> Self {
        Self::root(family::BOOKMARK_DATA).with(KeyToken::id(post_id))
    }

    pub fn follower_data(user_id: &str) -> Self {
        Self::root(family::FOLLOWER_DATA).with(KeyToken::id(user_id))
    }

    pub fn unread_notifications_count() -> Self {
        Self::root(family::UNREAD_NOTIFICATIONS)
    }

    pub fn unread_messages_count() -> Self {
        Self::root(family::UNREAD_MESSAGES)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in &self.0 {
            if !first {
                f.write_str(":")?;
            }
            write!(f, "{}", token)?;
            first = false;
        }
        Ok(())
    }
}
