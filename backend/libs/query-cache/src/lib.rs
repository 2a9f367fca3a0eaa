//! Nova client query cache
//!
//! Key-addressed, in-memory store of query results shared by every view of
//! the client:
//! - Structured, structurally-equal keys (`["like-data", <post_id>]`)
//! - Selectors addressing sets of keys (exact, prefix, token containment)
//! - Paginated collections (`InfiniteData`) with cursor-based page loading
//! - Stale marking on invalidation, refetch on next read
//! - Cooperative read cancellation: superseded fetch results are dropped
//! - Change subscriptions and Prometheus metrics

mod error;
mod infinite;
mod keys;
mod metrics;
mod selector;
mod store;
mod subscription;

pub use error::{CacheError, CacheResult, FetchError};
pub use infinite::{InfiniteData, Page};
pub use keys::{family, CacheKey, KeyToken};
pub use metrics::CacheMetrics;
pub use selector::KeySelector;
pub use store::{CachedValue, FetchOutcome, QueryCache};
pub use subscription::{CacheEvent, CacheEventKind, CacheSubscription};

use serde_json::Value;

/// Source of authoritative query results.
///
/// For paginated keys the fetcher returns one page (`{ records, nextCursor }`)
/// for the given cursor; for single-record keys the cursor is always `None`.
#[async_trait::async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &CacheKey, cursor: Option<&str>) -> Result<Value, FetchError>;
}
