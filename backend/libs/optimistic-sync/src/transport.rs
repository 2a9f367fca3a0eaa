//! Network mutation interface
//!
//! One request per user action; the transport never retries.

use crate::models::{CommentRecord, PostRecord, UserSummary};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Server-side intent of a user action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationRequest {
    Follow { user_id: String },
    Unfollow { user_id: String },
    Like { post_id: String },
    Unlike { post_id: String },
    Bookmark { post_id: String },
    Unbookmark { post_id: String },
    CreateComment { post_id: String, content: String },
    DeleteComment { comment_id: String },
    MarkNotificationRead { notification_id: String },
    MarkAllNotificationsRead,
    UpdateProfile {
        display_name: String,
        bio: Option<String>,
    },
    CreatePost {
        content: String,
        media_ids: Vec<String>,
    },
    DeletePost { post_id: String },
}

/// Authoritative answer: a record or an empty acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub enum MutationResponse {
    Ack,
    Post(PostRecord),
    Comment(CommentRecord),
    User(UserSummary),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Validation(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MutationTransport: Send + Sync {
    /// Whether a session is available to authenticate requests
    fn has_session(&self) -> bool;

    /// Issue exactly one request
    async fn send(&self, request: &MutationRequest) -> Result<MutationResponse, TransportError>;
}
