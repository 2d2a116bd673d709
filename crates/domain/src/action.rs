//! Queued mutation types.
//!
//! An [`Action`] is one mutation intent awaiting delivery to the remote
//! system. Actions are created only at enqueue time and mutated only by the
//! queue during a drain; the persisted representation is exactly the serde
//! form of this struct.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of mutation an action replays against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "Create"),
            ActionKind::Update => write!(f, "Update"),
            ActionKind::Delete => write!(f, "Delete"),
        }
    }
}

/// Action status in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Syncing,
    Success,
    Failed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Pending => write!(f, "Pending"),
            ActionStatus::Syncing => write!(f, "Syncing"),
            ActionStatus::Success => write!(f, "Success"),
            ActionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One queued mutation intent awaiting delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Opaque unique identifier, assigned at enqueue time.
    pub id: String,
    pub kind: ActionKind,
    /// Logical entity the mutation applies to (used for inspection only).
    pub entity: String,
    pub entity_id: String,
    /// Opaque payload the transport needs to replay the mutation.
    pub payload: Value,
    /// Enqueue timestamp; FIFO ordering and eviction tie-break key.
    pub enqueued_at: DateTime<Utc>,
    /// Incremented only on a failed attempt that will be retried.
    pub retry_count: u32,
    pub max_retries: u32,
    pub status: ActionStatus,
    /// Last failure message; present after a failed attempt.
    pub last_error: Option<String>,
}

impl Action {
    /// Create a new pending action with a fresh id.
    pub fn new(
        kind: ActionKind,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Value,
        max_retries: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            entity: entity.into(),
            entity_id: entity_id.into(),
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            max_retries,
            status: ActionStatus::Pending,
            last_error: None,
        }
    }

    /// True while the retry budget has not been spent.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// True when the action should be picked up by the next drain.
    pub fn is_eligible(&self) -> bool {
        match self.status {
            ActionStatus::Pending => true,
            ActionStatus::Failed => self.can_retry(),
            ActionStatus::Syncing | ActionStatus::Success => false,
        }
    }

    /// True once the action has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ActionStatus::Success | ActionStatus::Failed)
    }

    /// Mark the action as in-flight for the current drain.
    pub fn mark_syncing(&mut self) {
        self.status = ActionStatus::Syncing;
    }

    /// Mark the action as delivered.
    pub fn mark_synced(&mut self) {
        self.status = ActionStatus::Success;
        self.last_error = None;
    }

    /// Record a failed attempt that stays retryable: the action returns to
    /// `Pending` with the retry count incremented and the error kept.
    pub fn record_retryable_failure(&mut self, error: impl Into<String>) {
        self.retry_count = self.retry_count.saturating_add(1).min(self.max_retries);
        self.status = ActionStatus::Pending;
        self.last_error = Some(error.into());
    }

    /// Record a failed attempt with the retry budget spent. The retry count
    /// is left untouched so `retry_count == max_retries` holds at the
    /// transition into `Failed`.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = ActionStatus::Failed;
        self.last_error = Some(error.into());
    }

    /// Reset a failed action for another round of attempts. The retry count
    /// is deliberately preserved so a manual re-queue buys exactly one more
    /// attempt, not a fresh budget.
    pub fn requeue(&mut self) {
        self.status = ActionStatus::Pending;
    }
}
