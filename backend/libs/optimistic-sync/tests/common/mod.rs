//! Shared fakes for the scenario suites

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use optimistic_sync::models::{
    CommentRecord, NotificationIssuer, NotificationRecord, NotificationType, PostRecord,
    UserSummary,
};
use optimistic_sync::{MutationRequest, MutationResponse, MutationTransport, TransportError};
use parking_lot::Mutex;
use query_cache::{CacheKey, FetchError, InfiniteData, Page, QueryFetcher};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;

type Observer = Arc<dyn Fn(&MutationRequest) + Send + Sync>;

/// Transport answering from a script; `Ack` once the script runs out
pub struct ScriptedTransport {
    session: bool,
    script: Mutex<VecDeque<Result<MutationResponse, TransportError>>>,
    sent: Mutex<Vec<MutationRequest>>,
    gate: Option<Arc<Semaphore>>,
    observer: Option<Observer>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            session: true,
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            gate: None,
            observer: None,
        }
    }

    pub fn respond(self, result: Result<MutationResponse, TransportError>) -> Self {
        self.script.lock().push_back(result);
        self
    }

    pub fn without_session(mut self) -> Self {
        self.session = false;
        self
    }

    /// Hold every request until a permit is added to `gate`
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Called when a request is issued, before the response
    pub fn observe(
        mut self,
        observer: impl Fn(&MutationRequest) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn sent(&self) -> Vec<MutationRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MutationTransport for ScriptedTransport {
    fn has_session(&self) -> bool {
        self.session
    }

    async fn send(&self, request: &MutationRequest) -> Result<MutationResponse, TransportError> {
        self.sent.lock().push(request.clone());
        if let Some(observer) = &self.observer {
            observer(request);
        }
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(MutationResponse::Ack))
    }
}

/// Authoritative state the server would return on refetch
#[derive(Default)]
pub struct FakeServer {
    records: Mutex<HashMap<CacheKey, Value>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            gate: Some(gate),
        }
    }

    pub fn put(&self, key: CacheKey, value: Value) {
        self.records.lock().insert(key, value);
    }
}

#[async_trait]
impl QueryFetcher for FakeServer {
    async fn fetch(&self, key: &CacheKey, _cursor: Option<&str>) -> Result<Value, FetchError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.records
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(key.to_string()))
    }
}

pub fn user(id: &str) -> UserSummary {
    UserSummary {
        id: id.to_string(),
        username: format!("user_{}", id),
        display_name: format!("User {}", id),
        avatar_url: None,
        bio: None,
        follower_count: 10,
        post_count: 1,
        is_followed_by_user: false,
    }
}

pub fn post(id: &str, author: &str) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        content: format!("post {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        user: user(author),
        attachments: vec![],
        like_count: 4,
        comment_count: 0,
        is_liked_by_user: false,
        is_bookmarked_by_user: false,
    }
}

pub fn comment(id: &str, post_id: &str, author: &str) -> CommentRecord {
    CommentRecord {
        id: id.to_string(),
        post_id: post_id.to_string(),
        content: format!("comment {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
        user: user(author),
    }
}

pub fn notification(id: &str) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        kind: NotificationType::Follow,
        issuer: NotificationIssuer {
            username: "grace".to_string(),
            display_name: "Grace".to_string(),
            avatar_url: None,
        },
        post_id: None,
        read: false,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
    }
}

/// One-page collection as stored in the cache
pub fn feed<T: serde::Serialize>(records: Vec<T>) -> Value {
    serde_json::to_value(InfiniteData::first(Page::new(records, None))).unwrap()
}

/// One page as served by the API
pub fn page<T: serde::Serialize>(records: Vec<T>) -> Value {
    serde_json::to_value(Page::new(records, None)).unwrap()
}

pub fn records<T: serde::de::DeserializeOwned + Clone>(value: &Value) -> Vec<T> {
    let feed: InfiniteData<T> = serde_json::from_value(value.clone()).unwrap();
    feed.records().cloned().collect()
}
