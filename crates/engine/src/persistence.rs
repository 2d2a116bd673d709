//! Queue persistence: one durable key, full-array replace.
//!
//! The adapter never raises storage problems to its caller. Losing
//! durability is acceptable; crashing the producer is not. A corrupt or
//! missing blob degrades to an empty queue.

use std::sync::Arc;

use offsync_core::BlobStore;
use offsync_domain::{Action, ActionStatus};
use tracing::{debug, info, warn};

/// Persists the whole action list as a single JSON blob.
pub struct PersistenceAdapter {
    store: Arc<dyn BlobStore>,
    key: String,
}

impl PersistenceAdapter {
    /// Create an adapter writing under the given durable key.
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    /// Save the queue. Serialization or storage failures are logged and
    /// swallowed.
    pub async fn save(&self, actions: &[Action]) {
        let bytes = match serde_json::to_vec(actions) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize queue; skipping persistence");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &bytes).await {
            warn!(key = %self.key, error = %e, "Failed to persist queue");
        } else {
            debug!(key = %self.key, count = actions.len(), "Persisted queue");
        }
    }

    /// Load the queue. A missing key or corrupt blob yields an empty list.
    ///
    /// Reloaded actions are normalized: an action persisted mid-drain as
    /// `Syncing` resumes as `Pending`, and `Success` actions are dropped
    /// (their grace window does not survive a restart).
    pub async fn load(&self) -> Vec<Action> {
        let bytes = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %self.key, "No persisted queue found");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read persisted queue; starting empty");
                return Vec::new();
            }
        };

        let mut actions: Vec<Action> = match serde_json::from_slice(&bytes) {
            Ok(actions) => actions,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persisted queue is corrupt; starting empty");
                return Vec::new();
            }
        };

        actions.retain(|a| a.status != ActionStatus::Success);
        for action in &mut actions {
            if action.status == ActionStatus::Syncing {
                action.status = ActionStatus::Pending;
            }
        }

        info!(key = %self.key, count = actions.len(), "Loaded persisted queue");
        actions
    }
}
