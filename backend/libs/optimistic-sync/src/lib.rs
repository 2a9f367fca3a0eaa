//! Optimistic cache synchronization for client mutations
//!
//! Keeps cached feeds, counters and detail records consistent while a user
//! action is on the wire:
//!
//! ```text
//! user action
//!   -> validate / session check        (rejected: no cache writes)
//!   -> cancel in-flight reads for the affected keys
//!   -> snapshot affected keys
//!   -> apply update rule to every materialized key (one write lock)
//!   -> send exactly one request
//!        ok:  merge server record (placeholders), success toast
//!        err: restore snapshot, error toast
//!   -> invalidate affected keys (next read refetches)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use optimistic_sync::{MutationOrchestrator, SyncAction};
//! use query_cache::QueryCache;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(QueryCache::new());
//! let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
//!
//! let outcome = orchestrator
//!     .execute(SyncAction::LikeToggle {
//!         post_id: "clx1".to_string(),
//!         currently_liked: false,
//!     })
//!     .await;
//! ```

pub mod action;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod orchestrator;
pub mod rules;
pub mod snapshot;
pub mod stats;
pub mod toast;
pub mod transport;

pub use action::{ActionKind, CommentInput, PostInput, ProfileInput, SyncAction};
pub use error::{SyncError, SyncResult};
pub use lifecycle::{LifecycleState, MutationLifecycle, Transition};
pub use orchestrator::{MutationOrchestrator, MutationOutcome, MutationStatus};
pub use rules::{rule_for, KeyPlan, UpdateRule};
pub use snapshot::{Captured, Snapshot};
pub use stats::{StatsCollector, SyncStats};
pub use toast::{CollectingToasts, LogToasts, Toast, ToastSink, ToastVariant};
pub use transport::{MutationRequest, MutationResponse, MutationTransport, TransportError};
