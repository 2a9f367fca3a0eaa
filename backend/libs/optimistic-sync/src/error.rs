//! Error types for optimistic synchronization

use crate::lifecycle::LifecycleState;
use crate::transport::TransportError;
use query_cache::CacheError;
use thiserror::Error;

/// Synchronization errors
///
/// `Validation` and `Unauthorized` are raised during admission, before any
/// cache write. Everything else is raised after the optimistic apply and triggers
/// rollback. Counter drift between concurrent actions is not an error; the
/// settle-phase invalidation resolves it.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed action input, caught locally
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Server refused the request as invalid (400/422)
    #[error("Rejected by server: {0}")]
    ServerRejected(String),

    /// No valid session
    #[error("Unauthorized")]
    Unauthorized,

    /// Target record vanished server-side
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport or server failure, including timeouts
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cached value does not have the shape its key implies
    #[error("Malformed cached value: {0}")]
    Malformed(String),

    /// Record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl SyncError {
    /// Rejected before entering the lifecycle
    pub fn is_rejection(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Unauthorized)
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized => SyncError::Unauthorized,
            TransportError::NotFound(what) => SyncError::NotFound(what),
            TransportError::Validation(msg) => SyncError::ServerRejected(msg),
            other => SyncError::NetworkFailure(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(err: validator::ValidationErrors) -> Self {
        SyncError::Validation(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
