//! Drives one action through its optimistic lifecycle
//!
//! ```text
//! Idle -> Canceling -> Snapshotting -> Applying -> InFlight -> Succeeded -> Settled
//!                                          |            |
//!                                          +-> Failed <-+-> (rollback) -> Settled
//! ```
//!
//! Everything up to `InFlight` is synchronous, so the optimistic values are
//! visible before the request leaves. Independent actions are not
//! serialized; `Settled` always invalidates, so the last refetch wins.

use crate::action::{ActionKind, SyncAction};
use crate::error::{SyncError, SyncResult};
use crate::lifecycle::{LifecycleState, MutationLifecycle};
use crate::rules::rule_for;
use crate::snapshot::Snapshot;
use crate::stats::{StatsCollector, SyncStats};
use crate::toast::{LogToasts, Toast, ToastSink};
use crate::transport::{MutationResponse, MutationTransport};
use query_cache::{CacheKey, QueryCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Succeeded,
    /// Rolled back after the optimistic apply
    Failed,
    /// Refused before any cache write
    Rejected,
}

/// Settled result of one action. Always produced; the orchestrator never
/// returns an error to its caller.
#[derive(Debug)]
pub struct MutationOutcome {
    pub lifecycle_id: Uuid,
    pub kind: ActionKind,
    pub status: MutationStatus,
    pub error: Option<SyncError>,
    pub response: Option<MutationResponse>,
    /// Keys whose value the optimistic apply changed
    pub affected_keys: Vec<CacheKey>,
    pub history: Vec<LifecycleState>,
    pub rolled_back: bool,
    /// Keys marked stale during `Settled`
    pub invalidated: usize,
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        self.status == MutationStatus::Succeeded
    }

    fn rejected(lifecycle: &MutationLifecycle, error: SyncError) -> Self {
        Self {
            lifecycle_id: lifecycle.id(),
            kind: lifecycle.kind(),
            status: MutationStatus::Rejected,
            error: Some(error),
            response: None,
            affected_keys: Vec::new(),
            history: lifecycle.path(),
            rolled_back: false,
            invalidated: 0,
        }
    }
}

pub struct MutationOrchestrator<T: MutationTransport> {
    cache: Arc<QueryCache>,
    transport: T,
    toasts: Arc<dyn ToastSink>,
    stats: StatsCollector,
}

impl<T: MutationTransport> MutationOrchestrator<T> {
    pub fn new(cache: Arc<QueryCache>, transport: T) -> Self {
        Self {
            cache,
            transport,
            toasts: Arc::new(LogToasts),
            stats: StatsCollector::new(),
        }
    }

    pub fn with_toasts(mut self, toasts: Arc<dyn ToastSink>) -> Self {
        self.toasts = toasts;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.snapshot()
    }

    /// Validation and session checks; nothing is written when these fail
    fn admit(&self, action: &SyncAction) -> SyncResult<()> {
        action.validate()?;
        if !self.transport.has_session() {
            return Err(SyncError::Unauthorized);
        }
        Ok(())
    }

    /// Run one action to `Settled`
    pub async fn execute(&self, action: SyncAction) -> MutationOutcome {
        let kind = action.kind();
        let mut lifecycle = MutationLifecycle::new(kind);

        if let Err(err) = self.admit(&action) {
            warn!(action = %kind, error = %err, "Action rejected");
            self.stats.record_rejection();
            return MutationOutcome::rejected(&lifecycle, err);
        }

        let started = Instant::now();
        self.stats.record_start();

        let rule = rule_for(&action);
        let plan = rule.plan();
        let selector = plan.selector();

        advance(&mut lifecycle, LifecycleState::Canceling);
        let cancelled = self.cache.cancel_reads(&selector);
        debug!(action = %kind, cancelled, "Superseded in-flight reads");

        advance(&mut lifecycle, LifecycleState::Snapshotting);
        let mut snapshot = Snapshot::capture(&self.cache, &plan);

        advance(&mut lifecycle, LifecycleState::Applying);
        let mut affected_keys = Vec::new();
        let result = match self
            .cache
            .update_where(&selector, |key, value| rule.apply(key, value))
        {
            Ok(keys) => {
                debug!(action = %kind, keys = keys.len(), "Optimistic update applied");
                snapshot.retain_changed(&keys);
                affected_keys = keys;
                advance(&mut lifecycle, LifecycleState::InFlight);
                self.transport
                    .send(&action.request())
                    .await
                    .map_err(SyncError::from)
            }
            Err(err) => {
                // Nothing was written; there is nothing to roll back
                snapshot.retain_changed(&[]);
                Err(err)
            }
        };

        let mut rolled_back = false;
        let (status, error, response) = match result {
            Ok(response) => {
                advance(&mut lifecycle, LifecycleState::Succeeded);
                if let Err(err) = rule.merge(&response, &self.cache) {
                    // The settle refetch still reconciles the cache
                    warn!(action = %kind, error = %err, "Failed to merge server response");
                }
                if let Some(message) = kind.success_message() {
                    self.toasts.show(Toast::success(message));
                }
                self.stats.record_success();
                (MutationStatus::Succeeded, None, Some(response))
            }
            Err(err) => {
                advance(&mut lifecycle, LifecycleState::Failed);
                rolled_back = snapshot.restore(&self.cache) && !snapshot.is_empty();
                error!(
                    lifecycle_id = %lifecycle.id(),
                    action = %kind,
                    error = %err,
                    "Mutation failed, optimistic update rolled back"
                );
                if let Some(message) = kind.failure_message() {
                    self.toasts.show(Toast::error(message));
                }
                self.stats.record_failure();
                if rolled_back {
                    self.stats.record_rollback();
                }
                (MutationStatus::Failed, Some(err), None)
            }
        };
        drop(snapshot);

        advance(&mut lifecycle, LifecycleState::Settled);
        let invalidated = self.cache.invalidate(&selector);
        self.stats
            .record_settle_latency(started.elapsed().as_secs_f64() * 1000.0);

        info!(
            lifecycle_id = %lifecycle.id(),
            action = %kind,
            status = ?status,
            invalidated,
            "Mutation settled"
        );

        MutationOutcome {
            lifecycle_id: lifecycle.id(),
            kind,
            status,
            error,
            response,
            affected_keys,
            history: lifecycle.path(),
            rolled_back,
            invalidated,
        }
    }
}

fn advance(lifecycle: &mut MutationLifecycle, next: LifecycleState) {
    if let Err(err) = lifecycle.transition(next) {
        error!(lifecycle_id = %lifecycle.id(), error = %err, "Lifecycle invariant violated");
    }
}
