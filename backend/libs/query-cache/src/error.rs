use thiserror::Error;

/// Failure reported by an authoritative fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unsupported query key: {0}")]
    UnsupportedKey(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Key is not a paginated query: {0}")]
    NotPaginated(String),

    #[error("Read superseded for key: {0}")]
    Superseded(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
