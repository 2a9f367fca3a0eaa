//! Change notifications for cache readers

use crate::keys::CacheKey;
use crate::selector::KeySelector;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// Value written (optimistic apply, rollback or fetch completion)
    Updated,
    /// Value marked stale; next read refetches
    Invalidated,
    /// Key removed from the store
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: CacheKey,
    pub kind: CacheEventKind,
}

/// Receiver filtered to the keys of one selector
pub struct CacheSubscription {
    selector: KeySelector,
    receiver: broadcast::Receiver<CacheEvent>,
}

impl CacheSubscription {
    pub(crate) fn new(selector: KeySelector, receiver: broadcast::Receiver<CacheEvent>) -> Self {
        Self { selector, receiver }
    }

    /// Wait for the next matching event. `None` once the cache is dropped.
    pub async fn recv(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.selector.matches(&event.key) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Cache subscriber lagged, skipping events");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting
    pub fn try_recv(&mut self) -> Option<CacheEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.selector.matches(&event.key) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every queued matching event
    pub fn drain(&mut self) -> Vec<CacheEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}
