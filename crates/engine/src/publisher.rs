//! Synchronous status listener registry.
//!
//! Notification happens inline with the mutation that caused it, so
//! listeners must not block or do async work in the callback.

use std::sync::{Arc, Weak};

use offsync_domain::SyncStatus;
use parking_lot::Mutex;
use tracing::debug;

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Observer registry broadcasting the aggregate [`SyncStatus`].
#[derive(Clone, Default)]
pub struct StatusPublisher {
    registry: Arc<Mutex<Registry>>,
}

impl StatusPublisher {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Dropping the returned [`Subscription`] (or
    /// calling [`Subscription::unsubscribe`]) removes it.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));
        debug!(listener_id = id, "Status listener subscribed");

        Subscription { id, registry: Arc::downgrade(&self.registry) }
    }

    /// Call every current listener with a freshly computed status.
    pub fn publish(&self, status: &SyncStatus) {
        // Snapshot outside the lock so a listener may subscribe/unsubscribe
        // from within its callback.
        let listeners: Vec<Listener> =
            self.registry.lock().listeners.iter().map(|(_, l)| Arc::clone(l)).collect();

        for listener in listeners {
            listener(status);
        }
    }

    /// Number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

/// Handle for one registered listener.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}

    fn remove(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().listeners.retain(|(id, _)| *id != self.id);
            debug!(listener_id = self.id, "Status listener unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}
