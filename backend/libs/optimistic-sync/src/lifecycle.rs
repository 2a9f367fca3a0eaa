//! Per-action mutation state machine

use crate::action::ActionKind;
use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Phases of one optimistic mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No cycle started yet
    Idle,
    /// Superseding in-flight reads for the affected keys
    Canceling,
    /// Capturing pre-mutation values
    Snapshotting,
    /// Writing the optimistic values
    Applying,
    /// Waiting on the network request
    InFlight,
    /// Server confirmed the mutation
    Succeeded,
    /// Mutation failed and the snapshot was restored
    Failed,
    /// Affected keys invalidated
    Settled,
}

impl LifecycleState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Check if the optimistic values may be visible in the cache
    pub fn is_speculative(&self) -> bool {
        matches!(self, Self::Applying | Self::InFlight)
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Canceling)
                | (Canceling, Snapshotting)
                | (Snapshotting, Applying)
                | (Applying, InFlight)
                | (Applying, Failed)
                | (InFlight, Succeeded)
                | (InFlight, Failed)
                | (Succeeded, Settled)
                | (Failed, Settled)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Canceling => write!(f, "canceling"),
            Self::Snapshotting => write!(f, "snapshotting"),
            Self::Applying => write!(f, "applying"),
            Self::InFlight => write!(f, "in_flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Settled => write!(f, "settled"),
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "canceling" => Ok(Self::Canceling),
            "snapshotting" => Ok(Self::Snapshotting),
            "applying" => Ok(Self::Applying),
            "in_flight" => Ok(Self::InFlight),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "settled" => Ok(Self::Settled),
            _ => Err(format!("Invalid lifecycle state: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub at: DateTime<Utc>,
}

/// One action's round trip. Not persisted.
#[derive(Debug, Clone)]
pub struct MutationLifecycle {
    id: Uuid,
    kind: ActionKind,
    state: LifecycleState,
    history: Vec<Transition>,
}

impl MutationLifecycle {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: LifecycleState::Idle,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Visited states in order, starting with `Idle`
    pub fn path(&self) -> Vec<LifecycleState> {
        std::iter::once(LifecycleState::Idle)
            .chain(self.history.iter().map(|t| t.to))
            .collect()
    }

    pub fn transition(&mut self, next: LifecycleState) -> SyncResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!(
            lifecycle_id = %self.id,
            action = %self.kind,
            from = %self.state,
            to = %next,
            "Lifecycle transition"
        );
        self.history.push(Transition {
            from: self.state,
            to: next,
            at: Utc::now(),
        });
        self.state = next;
        Ok(())
    }
}
