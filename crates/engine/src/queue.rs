//! In-memory action queue: the single source of truth.
//!
//! Every structural mutation persists a full snapshot through the
//! [`PersistenceAdapter`] and then publishes a freshly computed
//! [`SyncStatus`]. Ordering is strict enqueue order; a retried action keeps
//! its original position rather than moving to the back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use offsync_domain::{Action, ActionKind, ActionStatus, EngineConfig, SyncStatus};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::persistence::PersistenceAdapter;
use crate::publisher::StatusPublisher;

/// Scheduler-owned flags folded into every published status.
#[derive(Default)]
pub(crate) struct SyncFlags {
    pub(crate) syncing: AtomicBool,
    pub(crate) last_sync: Mutex<Option<DateTime<Utc>>>,
}

struct QueueInner {
    actions: Mutex<Vec<Action>>,
    persistence: PersistenceAdapter,
    publisher: StatusPublisher,
    connectivity: Arc<ConnectivityMonitor>,
    flags: Arc<SyncFlags>,
    max_pending: usize,
    default_max_retries: u32,
}

/// Ordered collection of pending, in-flight, and terminal actions.
#[derive(Clone)]
pub struct ActionQueue {
    inner: Arc<QueueInner>,
}

impl ActionQueue {
    pub(crate) fn new(
        persistence: PersistenceAdapter,
        publisher: StatusPublisher,
        connectivity: Arc<ConnectivityMonitor>,
        flags: Arc<SyncFlags>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                actions: Mutex::new(Vec::new()),
                persistence,
                publisher,
                connectivity,
                flags,
                max_pending: config.max_pending_actions,
                default_max_retries: config.max_retries,
            }),
        }
    }

    /// Install restored actions without persisting or publishing.
    pub(crate) fn seed(&self, actions: Vec<Action>) {
        *self.inner.actions.lock() = actions;
    }

    /// Append a new pending action and return its id.
    ///
    /// Never fails. At the soft capacity cap the oldest `Pending` action is
    /// evicted first; if nothing is evictable (all in-flight or failed) the
    /// queue temporarily exceeds the cap, since dropping in-flight or
    /// already-failed work is unsafe.
    pub async fn enqueue(
        &self,
        kind: ActionKind,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Value,
        max_retries: Option<u32>,
    ) -> String {
        let action = Action::new(
            kind,
            entity,
            entity_id,
            payload,
            max_retries.unwrap_or(self.inner.default_max_retries),
        );
        let id = action.id.clone();

        let snapshot = {
            let mut actions = self.inner.actions.lock();

            if actions.len() >= self.inner.max_pending {
                match actions.iter().position(|a| a.status == ActionStatus::Pending) {
                    Some(pos) => {
                        let evicted = actions.remove(pos);
                        warn!(
                            evicted_id = %evicted.id,
                            cap = self.inner.max_pending,
                            "Queue at capacity; evicted oldest pending action"
                        );
                    }
                    None => {
                        warn!(
                            cap = self.inner.max_pending,
                            "Queue at capacity with nothing evictable; exceeding soft cap"
                        );
                    }
                }
            }

            debug!(id = %action.id, kind = %action.kind, entity = %action.entity, "Enqueued action");
            actions.push(action);
            actions.clone()
        };

        self.commit(&snapshot).await;
        id
    }

    /// Merge a change into the matching action. Returns false when the id
    /// is unknown.
    pub async fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Action),
    {
        let snapshot = {
            let mut actions = self.inner.actions.lock();
            let Some(action) = actions.iter_mut().find(|a| a.id == id) else {
                return false;
            };
            mutate(action);
            actions.clone()
        };

        self.commit(&snapshot).await;
        true
    }

    /// Delete an action. Returns false when the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let snapshot = {
            let mut actions = self.inner.actions.lock();
            let before = actions.len();
            actions.retain(|a| a.id != id);
            if actions.len() == before {
                return false;
            }
            debug!(id = id, "Removed action");
            actions.clone()
        };

        self.commit(&snapshot).await;
        true
    }

    /// Actions eligible for a retry attempt, in enqueue order.
    pub fn list_pending(&self) -> Vec<Action> {
        self.inner.actions.lock().iter().filter(|a| a.is_eligible()).cloned().collect()
    }

    /// Read-only filter over the logical entity. No side effects.
    pub fn list_by_entity(&self, entity: &str) -> Vec<Action> {
        self.inner.actions.lock().iter().filter(|a| a.entity == entity).cloned().collect()
    }

    /// Snapshot of one action by id.
    pub fn get(&self, id: &str) -> Option<Action> {
        self.inner.actions.lock().iter().find(|a| a.id == id).cloned()
    }

    /// Ids eligible for the current drain pass, in enqueue order.
    pub(crate) fn drain_batch(&self) -> Vec<String> {
        self.inner
            .actions
            .lock()
            .iter()
            .filter(|a| a.is_eligible())
            .map(|a| a.id.clone())
            .collect()
    }

    /// Total number of stored actions, terminal ones included.
    pub fn len(&self) -> usize {
        self.inner.actions.lock().len()
    }

    /// True when no actions are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.actions.lock().is_empty()
    }

    /// Drop all `Failed` actions. Returns how many were removed.
    pub async fn clear_failed(&self) -> usize {
        let (snapshot, removed) = {
            let mut actions = self.inner.actions.lock();
            let before = actions.len();
            actions.retain(|a| a.status != ActionStatus::Failed);
            (actions.clone(), before - actions.len())
        };

        if removed > 0 {
            debug!(removed = removed, "Cleared failed actions");
            self.commit(&snapshot).await;
        }
        removed
    }

    /// Drop every action. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let removed = {
            let mut actions = self.inner.actions.lock();
            let before = actions.len();
            actions.clear();
            before
        };

        if removed > 0 {
            debug!(removed = removed, "Cleared queue");
            self.commit(&[]).await;
        }
        removed
    }

    /// Re-queue a `Failed` action for another attempt, keeping its retry
    /// count. Returns false when the id is unknown or the action is not
    /// failed.
    pub async fn retry_failed(&self, id: &str) -> bool {
        let snapshot = {
            let mut actions = self.inner.actions.lock();
            let Some(action) =
                actions.iter_mut().find(|a| a.id == id && a.status == ActionStatus::Failed)
            else {
                return false;
            };
            action.requeue();
            debug!(id = id, retry_count = action.retry_count, "Re-queued failed action");
            actions.clone()
        };

        self.commit(&snapshot).await;
        true
    }

    /// Compute the aggregate status from the current action set plus the
    /// connectivity and scheduler flags.
    pub fn status(&self) -> SyncStatus {
        let actions = self.inner.actions.lock();
        let pending_count = actions
            .iter()
            .filter(|a| matches!(a.status, ActionStatus::Pending | ActionStatus::Syncing))
            .count();
        let sync_error_count =
            actions.iter().filter(|a| a.status == ActionStatus::Failed).count();
        drop(actions);

        SyncStatus {
            is_online: self.inner.connectivity.is_online(),
            is_syncing: self.inner.flags.syncing.load(Ordering::SeqCst),
            pending_count,
            last_sync_time: *self.inner.flags.last_sync.lock(),
            sync_error_count,
        }
    }

    /// Publish the current status to all subscribers.
    pub(crate) fn publish_status(&self) {
        let status = self.status();
        self.inner.publisher.publish(&status);
    }

    async fn commit(&self, snapshot: &[Action]) {
        self.inner.persistence.save(snapshot).await;
        self.publish_status();
    }
}
