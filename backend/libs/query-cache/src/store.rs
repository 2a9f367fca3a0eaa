//! In-memory query store
//!
//! All writes are synchronous and happen under one lock, so a multi-key
//! write is observed by readers either entirely or not at all. Reads that
//! suspend (authoritative fetches) carry a ticket holding the key's read
//! epoch at the time they started; `cancel_reads` bumps the epoch and the
//! late result is dropped when it arrives. A key's epoch is tracked only
//! while tickets for it are outstanding.

use crate::error::{CacheError, CacheResult};
use crate::infinite::{InfiniteData, Page};
use crate::keys::CacheKey;
use crate::metrics::CacheMetrics;
use crate::selector::KeySelector;
use crate::subscription::{CacheEvent, CacheEventKind, CacheSubscription};
use crate::QueryFetcher;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 1024;

/// Value stored under one key
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub data: Value,
    /// Set by invalidation; the next read refetches
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
    /// Monotonic write counter across the whole store
    pub version: u64,
}

/// Result of an authoritative read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Stored,
    /// A mutation cancelled the read while it was in flight
    Discarded,
    /// The collection has no further cursor
    NoMorePages,
}

/// Epoch of a key with reads in flight
#[derive(Debug, Default)]
struct ReadEpoch {
    epoch: u64,
    in_flight: usize,
}

/// One in-flight authoritative read; releases its registration on drop
struct ReadTicket<'a> {
    state: &'a RwLock<CacheState>,
    key: CacheKey,
    epoch: u64,
}

impl Drop for ReadTicket<'_> {
    fn drop(&mut self) {
        self.state.write().release_read(&self.key);
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedValue>,
    reads: HashMap<CacheKey, ReadEpoch>,
    next_version: u64,
}

impl CacheState {
    fn store(&mut self, key: CacheKey, data: Value) {
        self.next_version += 1;
        self.entries.insert(
            key,
            CachedValue {
                data,
                stale: false,
                updated_at: Utc::now(),
                version: self.next_version,
            },
        );
    }

    fn register_read(&mut self, key: &CacheKey) -> u64 {
        let read = self.reads.entry(key.clone()).or_default();
        read.in_flight += 1;
        read.epoch
    }

    fn release_read(&mut self, key: &CacheKey) {
        if let Some(read) = self.reads.get_mut(key) {
            read.in_flight = read.in_flight.saturating_sub(1);
            if read.in_flight == 0 {
                self.reads.remove(key);
            }
        }
    }

    fn is_current(&self, ticket: &ReadTicket<'_>) -> bool {
        self.reads.get(&ticket.key).map(|read| read.epoch) == Some(ticket.epoch)
    }
}

pub struct QueryCache {
    state: RwLock<CacheState>,
    events: broadcast::Sender<CacheEvent>,
    metrics: CacheMetrics,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(CacheState::default()),
            events,
            metrics: CacheMetrics::new(),
        }
    }

    fn emit(&self, key: CacheKey, kind: CacheEventKind) {
        // No subscribers is not an error
        let _ = self.events.send(CacheEvent { key, kind });
    }

    // ============= Reads =============

    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.state.read().entries.get(key).cloned()
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.data)?)),
            None => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.state.read().entries.contains_key(key)
    }

    /// `None` when the key is not materialized
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.state.read().entries.get(key).map(|v| v.stale)
    }

    /// Materialized keys matching the selector
    pub fn keys_matching(&self, selector: &KeySelector) -> Vec<CacheKey> {
        self.state
            .read()
            .entries
            .keys()
            .filter(|k| selector.matches(k))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ============= Writes =============

    pub fn set(&self, key: CacheKey, data: Value) {
        self.state.write().store(key.clone(), data);
        debug!(key = %key, "Cache write");
        self.metrics.record_write(&key);
        self.emit(key, CacheEventKind::Updated);
    }

    pub fn set_as<T: Serialize>(&self, key: CacheKey, value: &T) -> CacheResult<()> {
        let data = serde_json::to_value(value)?;
        self.set(key, data);
        Ok(())
    }

    /// Write only if nothing is cached yet (initial data from a server render)
    pub fn seed<T: Serialize>(&self, key: CacheKey, value: &T) -> CacheResult<bool> {
        let data = serde_json::to_value(value)?;
        {
            let mut state = self.state.write();
            if state.entries.contains_key(&key) {
                return Ok(false);
            }
            state.store(key.clone(), data);
        }
        self.metrics.record_write(&key);
        self.emit(key, CacheEventKind::Updated);
        Ok(true)
    }

    /// Evict a key
    pub fn remove(&self, key: &CacheKey) -> Option<CachedValue> {
        let removed = self.state.write().entries.remove(key);
        if removed.is_some() {
            debug!(key = %key, "Cache eviction");
            self.metrics.record_eviction(key);
            self.emit(key.clone(), CacheEventKind::Evicted);
        }
        removed
    }

    /// Transform every materialized key matching the selector.
    ///
    /// New values are computed first and committed together; if the
    /// transform fails for any key nothing is written. Returns the keys
    /// whose value changed.
    pub fn update_where<F, E>(
        &self,
        selector: &KeySelector,
        mut transform: F,
    ) -> Result<Vec<CacheKey>, E>
    where
        F: FnMut(&CacheKey, &mut Value) -> Result<bool, E>,
    {
        let changed = {
            let mut state = self.state.write();

            let mut pending = Vec::new();
            for (key, slot) in state.entries.iter().filter(|(k, _)| selector.matches(k)) {
                let mut data = slot.data.clone();
                if transform(key, &mut data)? {
                    pending.push((key.clone(), data));
                }
            }

            let mut changed = Vec::with_capacity(pending.len());
            for (key, data) in pending {
                state.store(key.clone(), data);
                changed.push(key);
            }
            changed
        };

        for key in &changed {
            debug!(key = %key, "Cache update");
            self.metrics.record_write(key);
            self.emit(key.clone(), CacheEventKind::Updated);
        }
        Ok(changed)
    }

    /// Write a batch under one lock: `Some` stores, `None` evicts
    pub fn write_many(&self, writes: Vec<(CacheKey, Option<Value>)>) {
        let mut events = Vec::with_capacity(writes.len());
        {
            let mut state = self.state.write();
            for (key, value) in writes {
                match value {
                    Some(data) => {
                        state.store(key.clone(), data);
                        events.push((key, CacheEventKind::Updated));
                    }
                    None => {
                        if state.entries.remove(&key).is_some() {
                            events.push((key, CacheEventKind::Evicted));
                        }
                    }
                }
            }
        }

        for (key, kind) in events {
            match kind {
                CacheEventKind::Evicted => self.metrics.record_eviction(&key),
                _ => self.metrics.record_write(&key),
            }
            self.emit(key, kind);
        }
    }

    /// Mark matching entries stale. Values are kept until the refetch lands.
    pub fn invalidate(&self, selector: &KeySelector) -> usize {
        let invalidated: Vec<CacheKey> = {
            let mut state = self.state.write();
            state
                .entries
                .iter_mut()
                .filter(|(k, _)| selector.matches(k))
                .map(|(k, v)| {
                    v.stale = true;
                    k.clone()
                })
                .collect()
        };

        for key in &invalidated {
            debug!(key = %key, "Cache invalidation");
            self.metrics.record_invalidation(key);
            self.emit(key.clone(), CacheEventKind::Invalidated);
        }
        invalidated.len()
    }

    /// Supersede every in-flight read for matching keys; returns how many
    /// keys had reads to supersede
    pub fn cancel_reads(&self, selector: &KeySelector) -> usize {
        let cancelled: Vec<CacheKey> = {
            let mut state = self.state.write();
            state
                .reads
                .iter_mut()
                .filter(|(k, _)| selector.matches(k))
                .map(|(k, read)| {
                    read.epoch += 1;
                    k.clone()
                })
                .collect()
        };

        for key in &cancelled {
            self.metrics.record_cancelled_read(key);
        }
        cancelled.len()
    }

    pub fn subscribe(&self, selector: KeySelector) -> CacheSubscription {
        CacheSubscription::new(selector, self.events.subscribe())
    }

    // ============= Authoritative reads =============

    fn begin_read(&self, key: &CacheKey) -> ReadTicket<'_> {
        let epoch = self.state.write().register_read(key);
        ReadTicket {
            state: &self.state,
            key: key.clone(),
            epoch,
        }
    }

    fn complete_read(&self, ticket: ReadTicket<'_>, data: Value) -> FetchOutcome {
        let stored = {
            let mut state = self.state.write();
            if state.is_current(&ticket) {
                state.store(ticket.key.clone(), data);
                true
            } else {
                false
            }
        };

        if !stored {
            warn!(key = %ticket.key, "Discarding superseded fetch result");
            self.metrics.record_discarded_fetch(&ticket.key);
            return FetchOutcome::Discarded;
        }

        self.metrics.record_write(&ticket.key);
        self.emit(ticket.key.clone(), CacheEventKind::Updated);
        FetchOutcome::Stored
    }

    /// Fetch and store the authoritative value (first page for collections)
    pub async fn fetch(
        &self,
        key: &CacheKey,
        fetcher: &dyn QueryFetcher,
    ) -> CacheResult<FetchOutcome> {
        self.fetch_pages(key, fetcher, 1).await
    }

    async fn fetch_pages(
        &self,
        key: &CacheKey,
        fetcher: &dyn QueryFetcher,
        pages: usize,
    ) -> CacheResult<FetchOutcome> {
        let ticket = self.begin_read(key);

        let data = if key.is_paginated() {
            let first: Page<Value> = serde_json::from_value(fetcher.fetch(key, None).await?)?;
            let mut collection = InfiniteData::first(first);

            while collection.pages.len() < pages {
                let Some(cursor) = collection.next_cursor().map(str::to_owned) else {
                    break;
                };
                let page: Page<Value> =
                    serde_json::from_value(fetcher.fetch(key, Some(&cursor)).await?)?;
                collection.push_page(Some(cursor), page);
            }
            serde_json::to_value(collection)?
        } else {
            fetcher.fetch(key, None).await?
        };

        Ok(self.complete_read(ticket, data))
    }

    /// Cached value if fresh, otherwise refetch.
    ///
    /// A stale collection is re-walked page by page up to the number of
    /// pages it had loaded. If the refetch is superseded the current value
    /// is returned.
    pub async fn ensure_fresh(
        &self,
        key: &CacheKey,
        fetcher: &dyn QueryFetcher,
    ) -> CacheResult<Value> {
        let pages = match self.get(key) {
            Some(value) if !value.stale => {
                self.metrics.record_hit(key);
                return Ok(value.data);
            }
            Some(value) if key.is_paginated() => {
                serde_json::from_value::<InfiniteData<Value>>(value.data)
                    .map(|c| c.pages.len().max(1))
                    .unwrap_or(1)
            }
            _ => 1,
        };

        self.metrics.record_miss(key);
        self.fetch_pages(key, fetcher, pages).await?;

        self.get(key)
            .map(|v| v.data)
            .ok_or_else(|| CacheError::Superseded(key.to_string()))
    }

    /// Append the page after the collection's last cursor
    pub async fn fetch_next_page(
        &self,
        key: &CacheKey,
        fetcher: &dyn QueryFetcher,
    ) -> CacheResult<FetchOutcome> {
        if !key.is_paginated() {
            return Err(CacheError::NotPaginated(key.to_string()));
        }

        let cursor = match self.get_as::<InfiniteData<Value>>(key)? {
            None => return self.fetch(key, fetcher).await,
            Some(collection) => match collection.next_cursor() {
                Some(cursor) => cursor.to_owned(),
                None => return Ok(FetchOutcome::NoMorePages),
            },
        };

        let ticket = self.begin_read(key);
        let page: Page<Value> = serde_json::from_value(fetcher.fetch(key, Some(&cursor)).await?)?;

        let stored = {
            let mut state = self.state.write();
            let current = match state.entries.get(key) {
                Some(slot) if state.is_current(&ticket) => {
                    Some(serde_json::from_value::<InfiniteData<Value>>(slot.data.clone())?)
                }
                _ => None,
            };

            match current {
                // The collection must still end where the request started
                Some(mut collection) if collection.next_cursor() == Some(cursor.as_str()) => {
                    collection.push_page(Some(cursor), page);
                    state.store(key.clone(), serde_json::to_value(collection)?);
                    true
                }
                _ => false,
            }
        };

        if !stored {
            warn!(key = %key, "Discarding superseded page");
            self.metrics.record_discarded_fetch(key);
            return Ok(FetchOutcome::Discarded);
        }

        self.metrics.record_write(key);
        self.emit(key.clone(), CacheEventKind::Updated);
        Ok(FetchOutcome::Stored)
    }
}
