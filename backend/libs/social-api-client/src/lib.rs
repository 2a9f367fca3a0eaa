//! Social API client
//!
//! HTTP implementation of the mutation transport and of the authoritative
//! query fetcher, plus configuration loading and tracing setup.
//!
//! ```ignore
//! use optimistic_sync::MutationOrchestrator;
//! use query_cache::QueryCache;
//! use social_api_client::{init_tracing, ClientConfig, SocialApiClient};
//! use std::sync::Arc;
//!
//! let config = ClientConfig::load(None)?;
//! init_tracing(&config);
//!
//! let client = SocialApiClient::new(&config)?;
//! let cache = Arc::new(QueryCache::new());
//! let orchestrator = MutationOrchestrator::new(cache.clone(), client.clone());
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod logging;

pub use crate::client::SocialApiClient;
pub use crate::config::{ClientConfig, LogFormat};
pub use crate::error::{ClientError, Result};
pub use crate::logging::init_tracing;
