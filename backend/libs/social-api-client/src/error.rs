//! Client errors and their mapping onto the sync and cache seams

use optimistic_sync::TransportError;
use query_cache::FetchError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Missing or expired session (401)
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Request rejected as malformed (400, 422)
    #[error("Validation error ({status}): {message}")]
    Validation { status: u16, message: String },

    /// Any other non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// Success status with a body that does not match the expected record
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Cache key with no matching endpoint
    #[error("No endpoint for query key: {0}")]
    UnsupportedKey(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// Error body served by the API: `{ "error": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ClientError {
    /// Classify a non-success response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation {
                status: status.as_u16(),
                message,
            },
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => TransportError::Unauthorized,
            ClientError::NotFound(what) => TransportError::NotFound(what),
            ClientError::Validation { message, .. } => TransportError::Validation(message),
            ClientError::Server { status, message } => TransportError::Server { status, message },
            ClientError::Timeout => TransportError::Timeout,
            other => TransportError::Network(other.to_string()),
        }
    }
}

impl From<ClientError> for FetchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => FetchError::Unauthorized,
            ClientError::NotFound(what) => FetchError::NotFound(what),
            ClientError::Validation { status, message }
            | ClientError::Server { status, message } => FetchError::Status { status, message },
            ClientError::Timeout => FetchError::Timeout,
            ClientError::UnsupportedKey(key) => FetchError::UnsupportedKey(key),
            other => FetchError::Transport(other.to_string()),
        }
    }
}
