//! Aggregate sync status published to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the engine's observable state.
///
/// Derived, never stored: recomputed from the current action set plus the
/// connectivity and scheduler flags on every publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    /// Actions still awaiting delivery (`Pending` or in-flight `Syncing`).
    pub pending_count: usize,
    /// Completion time of the last drain that delivered at least one action.
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Actions that exhausted their retry budget.
    pub sync_error_count: usize,
}

impl SyncStatus {
    /// Status of an idle, online engine with an empty queue.
    pub fn idle() -> Self {
        Self {
            is_online: true,
            is_syncing: false,
            pending_count: 0,
            last_sync_time: None,
            sync_error_count: 0,
        }
    }
}
