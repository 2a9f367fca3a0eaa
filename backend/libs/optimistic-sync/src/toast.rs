//! User-visible, non-blocking notifications

use crate::action::ActionKind;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

impl ActionKind {
    /// Toast shown when the server confirms the action, if any
    pub fn success_message(&self) -> Option<&'static str> {
        match self {
            ActionKind::CommentCreate => Some("Your comment has been created!"),
            ActionKind::CommentDelete => Some("Your comment has been deleted!"),
            ActionKind::ProfileUpdate => Some("Your profile has been updated"),
            ActionKind::PostCreate => Some("Your post has been created!"),
            ActionKind::PostDelete => Some("Post deleted"),
            _ => None,
        }
    }

    /// Toast shown after rollback, if any
    pub fn failure_message(&self) -> Option<&'static str> {
        match self {
            ActionKind::FollowToggle | ActionKind::LikeToggle | ActionKind::BookmarkToggle => {
                Some(GENERIC_FAILURE)
            }
            ActionKind::CommentCreate => {
                Some("An error occurred while submitting your comment.")
            }
            ActionKind::CommentDelete => Some("An error occurred while deleting your comment."),
            ActionKind::ProfileUpdate => Some("Failed to update your profile"),
            ActionKind::PostCreate => Some("An error occurred while submitting your post."),
            ActionKind::PostDelete => Some("Failed to delete post"),
            ActionKind::NotificationMarkOne | ActionKind::NotificationMarkAll => None,
        }
    }
}

pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Writes toasts to the log; used when no UI is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct LogToasts;

impl ToastSink for LogToasts {
    fn show(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => info!(toast = %toast.description, "Toast"),
            ToastVariant::Destructive => warn!(toast = %toast.description, "Toast"),
        }
    }
}

/// Keeps every toast in memory
#[derive(Debug, Default)]
pub struct CollectingToasts {
    toasts: Mutex<Vec<Toast>>,
}

impl CollectingToasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn take(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.toasts.lock())
    }
}

impl ToastSink for CollectingToasts {
    fn show(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}
