//! reqwest-backed client for the social API
//!
//! One instance serves both directions of cache synchronization: it sends
//! mutations for the orchestrator and answers authoritative reads for the
//! query cache.

use crate::config::ClientConfig;
use crate::endpoints::{mutation_route, query_route, Expect, Route};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use optimistic_sync::{MutationRequest, MutationResponse, MutationTransport, TransportError};
use query_cache::{CacheKey, FetchError, QueryFetcher};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SocialApiClient {
    http: Client,
    base_url: String,
    session_token: Option<String>,
}

impl SocialApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_token: config.session().map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and return the raw success body (`None` for 204 or empty)
    async fn call(&self, route: Route) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, route.path);
        debug!(method = %route.method, url = %url, "Calling social API");

        let mut request = self.http.request(route.method.clone(), &url);
        if !route.query.is_empty() {
            request = request.query(&route.query);
        }
        if let Some(token) = &self.session_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &route.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = ClientError::from_status(status, &text);
            warn!(
                method = %route.method,
                url = %url,
                status = status.as_u16(),
                error = %err,
                "Social API request failed"
            );
            return Err(err);
        }

        let text = response.text().await?;
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Send one mutation. A success status always counts as applied; a body
    /// that does not decode as the expected record degrades to `Ack`.
    pub async fn mutate(&self, request: &MutationRequest) -> Result<MutationResponse> {
        let (route, expect) = mutation_route(request);
        let path = route.path.clone();
        let body = match (expect, self.call(route).await) {
            (Expect::Ack, Ok(_)) | (_, Ok(None)) => return Ok(MutationResponse::Ack),
            (_, Ok(Some(body))) => body,
            (_, Err(ClientError::Decode(message))) => {
                warn!(path = %path, error = %message, "Mutation applied but body was not JSON");
                return Ok(MutationResponse::Ack);
            }
            (_, Err(err)) => return Err(err),
        };

        let decoded = match expect {
            Expect::Post => serde_json::from_value(body).map(MutationResponse::Post),
            Expect::Comment => serde_json::from_value(body).map(MutationResponse::Comment),
            Expect::User => serde_json::from_value(body).map(MutationResponse::User),
            Expect::Ack => Ok(MutationResponse::Ack),
        };
        Ok(decoded.unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "Mutation applied but body did not match the record");
            MutationResponse::Ack
        }))
    }

    pub async fn query(&self, key: &CacheKey, cursor: Option<&str>) -> Result<Value> {
        let route = query_route(key, cursor)?;
        self.call(route)
            .await?
            .ok_or_else(|| ClientError::Decode(format!("Empty body for {}", key)))
    }
}

#[async_trait]
impl MutationTransport for SocialApiClient {
    fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    async fn send(
        &self,
        request: &MutationRequest,
    ) -> std::result::Result<MutationResponse, TransportError> {
        self.mutate(request).await.map_err(TransportError::from)
    }
}

#[async_trait]
impl QueryFetcher for SocialApiClient {
    async fn fetch(
        &self,
        key: &CacheKey,
        cursor: Option<&str>,
    ) -> std::result::Result<Value, FetchError> {
        self.query(key, cursor).await.map_err(FetchError::from)
    }
}
