//! Client configuration
//!
//! # Loading Order
//! 1. Built-in defaults (`config/defaults.toml`)
//! 2. Optional TOML file
//! 3. Environment variables prefixed with `SOCIAL_CLIENT_`
//!    (e.g. `SOCIAL_CLIENT_BASE_URL`, `SOCIAL_CLIENT_SESSION_TOKEN`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

const ENV_PREFIX: &str = "SOCIAL_CLIENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientConfig {
    /// Origin of the social API, without trailing path
    #[validate(url)]
    pub base_url: String,

    /// Per-request timeout; a timeout fails the action like any other error
    #[validate(range(min = 100, max = 60000))]
    pub request_timeout_ms: u64,

    /// Session token sent as a bearer credential
    #[serde(default)]
    pub session_token: Option<String>,

    #[validate(length(min = 1))]
    pub user_agent: String,

    pub log_format: LogFormat,

    #[validate(length(min = 1))]
    pub log_level: String,
}

impl ClientConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/defaults.toml"),
            config::FileFormat::Toml,
        ));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder =
            builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let settings = builder.build().context("Failed to load client configuration")?;
        let config: ClientConfig = settings
            .try_deserialize()
            .context("Failed to deserialize client configuration")?;

        config.validate().context("Invalid client configuration")?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// A session token that is set and non-blank
    pub fn session(&self) -> Option<&str> {
        self.session_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
