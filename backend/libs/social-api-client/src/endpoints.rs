//! Route table: which HTTP call serves each mutation and each cached query

use crate::error::{ClientError, Result};
use optimistic_sync::MutationRequest;
use query_cache::{family, CacheKey, KeyToken};
use reqwest::Method;
use serde_json::{json, Value};
use urlencoding::encode;

/// Record the server answers a mutation with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Ack,
    Post,
    Comment,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl Route {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    fn get(path: String) -> Self {
        Self::new(Method::GET, path)
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn with_query(mut self, name: &'static str, value: &str) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    fn with_cursor(self, cursor: Option<&str>) -> Self {
        match cursor {
            Some(cursor) => self.with_query("cursor", cursor),
            None => self,
        }
    }
}

pub fn mutation_route(request: &MutationRequest) -> (Route, Expect) {
    match request {
        MutationRequest::Follow { user_id } => (
            Route::new(Method::POST, format!("/api/users/{}/followers", encode(user_id))),
            Expect::Ack,
        ),
        MutationRequest::Unfollow { user_id } => (
            Route::new(Method::DELETE, format!("/api/users/{}/followers", encode(user_id))),
            Expect::Ack,
        ),
        MutationRequest::Like { post_id } => (
            Route::new(Method::POST, format!("/api/posts/{}/likes", encode(post_id))),
            Expect::Ack,
        ),
        MutationRequest::Unlike { post_id } => (
            Route::new(Method::DELETE, format!("/api/posts/{}/likes", encode(post_id))),
            Expect::Ack,
        ),
        MutationRequest::Bookmark { post_id } => (
            Route::new(Method::POST, format!("/api/posts/{}/bookmarks", encode(post_id))),
            Expect::Ack,
        ),
        MutationRequest::Unbookmark { post_id } => (
            Route::new(Method::DELETE, format!("/api/posts/{}/bookmarks", encode(post_id))),
            Expect::Ack,
        ),
        MutationRequest::CreateComment { post_id, content } => (
            Route::new(Method::POST, format!("/api/posts/{}/comments", encode(post_id)))
                .with_body(json!({ "content": content })),
            Expect::Comment,
        ),
        MutationRequest::DeleteComment { comment_id } => (
            Route::new(Method::DELETE, format!("/api/comments/{}", encode(comment_id))),
            Expect::Ack,
        ),
        MutationRequest::MarkNotificationRead { notification_id } => (
            Route::new(Method::PATCH, "/api/notifications/mark-as-read".to_string())
                .with_body(json!({ "notificationId": notification_id })),
            Expect::Ack,
        ),
        MutationRequest::MarkAllNotificationsRead => (
            Route::new(Method::PATCH, "/api/notifications/mark-as-read".to_string()),
            Expect::Ack,
        ),
        MutationRequest::UpdateProfile { display_name, bio } => (
            Route::new(Method::PATCH, "/api/users/me".to_string())
                .with_body(json!({ "displayName": display_name, "bio": bio })),
            Expect::User,
        ),
        MutationRequest::CreatePost { content, media_ids } => (
            Route::new(Method::POST, "/api/posts".to_string())
                .with_body(json!({ "content": content, "mediaIds": media_ids })),
            Expect::Post,
        ),
        MutationRequest::DeletePost { post_id } => (
            Route::new(Method::DELETE, format!("/api/posts/{}", encode(post_id))),
            Expect::Ack,
        ),
    }
}

/// Endpoint serving a cached query; `cursor` selects the page of a feed
pub fn query_route(key: &CacheKey, cursor: Option<&str>) -> Result<Route> {
    let unsupported = || ClientError::UnsupportedKey(key.to_string());
    if key.len() > 3 {
        return Err(unsupported());
    }

    let tokens = key.tokens();
    let route = match (key.family(), tokens.get(1), tokens.get(2)) {
        (Some(family::LIKE_DATA), Some(KeyToken::Id(post_id)), None) => {
            Route::get(format!("/api/posts/{}/likes", encode(post_id)))
        }
        (Some(family::BOOKMARK_DATA), Some(KeyToken::Id(post_id)), None) => {
            Route::get(format!("/api/posts/{}/bookmarks", encode(post_id)))
        }
        (Some(family::FOLLOWER_DATA), Some(KeyToken::Id(user_id)), None) => {
            Route::get(format!("/api/users/{}/followers", encode(user_id)))
        }
        (Some(family::UNREAD_NOTIFICATIONS), None, None) => {
            Route::get("/api/notifications/unread-count".to_string())
        }
        (Some(family::UNREAD_MESSAGES), None, None) => {
            Route::get("/api/messages/unread-count".to_string())
        }
        (Some(family::NOTIFICATIONS_FEED), None, None) => {
            Route::get("/api/notifications".to_string()).with_cursor(cursor)
        }
        (Some(family::COMMENT_FEED), Some(KeyToken::Id(post_id)), None) => {
            Route::get(format!("/api/posts/{}/comments", encode(post_id))).with_cursor(cursor)
        }
        (Some(family::POST_FEED), Some(KeyToken::Label(feed)), None) => {
            let path = match feed.as_str() {
                family::FOR_YOU => "/api/posts/for-you",
                family::FOLLOWING => "/api/posts/following",
                family::BOOKMARKS => "/api/posts/bookmarks",
                _ => return Err(unsupported()),
            };
            Route::get(path.to_string()).with_cursor(cursor)
        }
        (Some(family::POST_FEED), Some(KeyToken::Label(feed)), Some(KeyToken::Id(arg))) => {
            match feed.as_str() {
                family::USER_POSTS => {
                    Route::get(format!("/api/users/{}/posts", encode(arg))).with_cursor(cursor)
                }
                family::SEARCH => Route::get("/api/search".to_string())
                    .with_query("query", arg)
                    .with_cursor(cursor),
                _ => return Err(unsupported()),
            }
        }
        _ => return Err(unsupported()),
    };
    Ok(route)
}
