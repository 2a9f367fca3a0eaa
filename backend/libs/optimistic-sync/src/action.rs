//! User actions and their validation

use crate::error::{SyncError, SyncResult};
use crate::models::UserSummary;
use crate::transport::MutationRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    FollowToggle,
    LikeToggle,
    BookmarkToggle,
    CommentCreate,
    CommentDelete,
    NotificationMarkOne,
    NotificationMarkAll,
    ProfileUpdate,
    PostCreate,
    PostDelete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::FollowToggle => "follow-toggle",
            ActionKind::LikeToggle => "like-toggle",
            ActionKind::BookmarkToggle => "bookmark-toggle",
            ActionKind::CommentCreate => "comment-create",
            ActionKind::CommentDelete => "comment-delete",
            ActionKind::NotificationMarkOne => "notification-mark-one",
            ActionKind::NotificationMarkAll => "notification-mark-all",
            ActionKind::ProfileUpdate => "profile-update",
            ActionKind::PostCreate => "post-create",
            ActionKind::PostDelete => "post-delete",
        }
    }

    pub fn is_toggle(&self) -> bool {
        matches!(
            self,
            ActionKind::FollowToggle | ActionKind::LikeToggle | ActionKind::BookmarkToggle
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some("Required".into());
        return Err(error);
    }
    Ok(())
}

fn require(field: &str, value: &str) -> SyncResult<()> {
    if value.trim().is_empty() {
        return Err(SyncError::Validation(format!("{}: Required", field)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct CommentInput {
    #[validate(custom(function = "not_blank"))]
    pub post_id: String,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    /// Signed-in user, shown on the placeholder until the server answers
    pub author: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct PostInput {
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[validate(length(max = 5, message = "Maximum of 5 media attachments allowed"))]
    pub media_ids: Vec<String>,
    pub author: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProfileInput {
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    #[validate(custom(function = "not_blank"))]
    pub display_name: String,
    #[validate(length(max = 1000, message = "Must be less than 1000 characters."))]
    pub bio: Option<String>,
    /// Already-uploaded avatar, if the user picked a new one
    pub avatar_url: Option<String>,
}

/// One user action with everything needed to run it.
///
/// Toggles carry the state the caller last saw; the intent is its negation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    FollowToggle {
        user_id: String,
        currently_following: bool,
    },
    LikeToggle {
        post_id: String,
        currently_liked: bool,
    },
    BookmarkToggle {
        post_id: String,
        currently_bookmarked: bool,
    },
    CommentCreate(CommentInput),
    CommentDelete {
        comment_id: String,
        post_id: String,
    },
    NotificationMarkOne {
        notification_id: String,
    },
    NotificationMarkAll,
    ProfileUpdate(ProfileInput),
    PostCreate(PostInput),
    PostDelete {
        post_id: String,
    },
}

impl SyncAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::FollowToggle { .. } => ActionKind::FollowToggle,
            SyncAction::LikeToggle { .. } => ActionKind::LikeToggle,
            SyncAction::BookmarkToggle { .. } => ActionKind::BookmarkToggle,
            SyncAction::CommentCreate(_) => ActionKind::CommentCreate,
            SyncAction::CommentDelete { .. } => ActionKind::CommentDelete,
            SyncAction::NotificationMarkOne { .. } => ActionKind::NotificationMarkOne,
            SyncAction::NotificationMarkAll => ActionKind::NotificationMarkAll,
            SyncAction::ProfileUpdate(_) => ActionKind::ProfileUpdate,
            SyncAction::PostCreate(_) => ActionKind::PostCreate,
            SyncAction::PostDelete { .. } => ActionKind::PostDelete,
        }
    }

    /// Reject malformed input before anything touches the cache
    pub fn validate(&self) -> SyncResult<()> {
        match self {
            SyncAction::FollowToggle { user_id, .. } => require("user_id", user_id),
            SyncAction::LikeToggle { post_id, .. }
            | SyncAction::BookmarkToggle { post_id, .. }
            | SyncAction::PostDelete { post_id } => require("post_id", post_id),
            SyncAction::CommentCreate(input) => Ok(input.validate()?),
            SyncAction::CommentDelete {
                comment_id,
                post_id,
            } => {
                require("comment_id", comment_id)?;
                require("post_id", post_id)
            }
            SyncAction::NotificationMarkOne { notification_id } => {
                require("notification_id", notification_id)
            }
            SyncAction::NotificationMarkAll => Ok(()),
            SyncAction::ProfileUpdate(input) => Ok(input.validate()?),
            SyncAction::PostCreate(input) => Ok(input.validate()?),
        }
    }

    /// The single network request this action issues
    pub fn request(&self) -> MutationRequest {
        match self {
            SyncAction::FollowToggle {
                user_id,
                currently_following,
            } => {
                let user_id = user_id.clone();
                if *currently_following {
                    MutationRequest::Unfollow { user_id }
                } else {
                    MutationRequest::Follow { user_id }
                }
            }
            SyncAction::LikeToggle {
                post_id,
                currently_liked,
            } => {
                let post_id = post_id.clone();
                if *currently_liked {
                    MutationRequest::Unlike { post_id }
                } else {
                    MutationRequest::Like { post_id }
                }
            }
            SyncAction::BookmarkToggle {
                post_id,
                currently_bookmarked,
            } => {
                let post_id = post_id.clone();
                if *currently_bookmarked {
                    MutationRequest::Unbookmark { post_id }
                } else {
                    MutationRequest::Bookmark { post_id }
                }
            }
            SyncAction::CommentCreate(input) => MutationRequest::CreateComment {
                post_id: input.post_id.clone(),
                content: input.content.trim().to_string(),
            },
            SyncAction::CommentDelete { comment_id, .. } => MutationRequest::DeleteComment {
                comment_id: comment_id.clone(),
            },
            SyncAction::NotificationMarkOne { notification_id } => {
                MutationRequest::MarkNotificationRead {
                    notification_id: notification_id.clone(),
                }
            }
            SyncAction::NotificationMarkAll => MutationRequest::MarkAllNotificationsRead,
            SyncAction::ProfileUpdate(input) => MutationRequest::UpdateProfile {
                display_name: input.display_name.trim().to_string(),
                bio: input.bio.clone(),
            },
            SyncAction::PostCreate(input) => MutationRequest::CreatePost {
                content: input.content.trim().to_string(),
                media_ids: input.media_ids.clone(),
            },
            SyncAction::PostDelete { post_id } => MutationRequest::DeletePost {
                post_id: post_id.clone(),
            },
        }
    }
}
