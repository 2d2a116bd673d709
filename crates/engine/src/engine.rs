//! Engine facade: wires the queue, scheduler, connectivity monitor, and
//! status publisher together behind one handle.

use std::sync::Arc;

use offsync_core::{ActionTransport, BlobStore};
use offsync_domain::{Action, ActionKind, EngineConfig, EngineError, Result, SyncStatus};
use serde_json::Value;
use tracing::info;

use crate::connectivity::ConnectivityMonitor;
use crate::persistence::PersistenceAdapter;
use crate::publisher::{StatusPublisher, Subscription};
use crate::queue::{ActionQueue, SyncFlags};
use crate::scheduler::SyncScheduler;

/// Offline action queue and synchronization engine.
///
/// Construct with [`SyncEngine::new`], then [`start`](Self::start) the
/// background scheduler. Enqueue is always available, online or not; the
/// scheduler drains whenever connectivity allows.
pub struct SyncEngine {
    queue: ActionQueue,
    connectivity: Arc<ConnectivityMonitor>,
    publisher: StatusPublisher,
    scheduler: SyncScheduler,
}

impl SyncEngine {
    /// Create an engine, restoring any previously persisted queue from the
    /// given store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the configuration is invalid.
    pub async fn new(
        config: EngineConfig,
        transport: Arc<dyn ActionTransport>,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        config.validate().map_err(EngineError::Config)?;

        let connectivity = Arc::new(ConnectivityMonitor::new(true));
        let publisher = StatusPublisher::new();
        let flags = Arc::new(SyncFlags::default());
        let persistence = PersistenceAdapter::new(store, config.storage_key.clone());

        let restored = persistence.load().await;
        let queue = ActionQueue::new(
            persistence,
            publisher.clone(),
            connectivity.clone(),
            flags.clone(),
            &config,
        );
        queue.seed(restored);

        let scheduler = SyncScheduler::new(
            queue.clone(),
            transport,
            connectivity.clone(),
            flags,
            &config,
        );

        info!(restored = queue.len(), "Sync engine initialized");
        Ok(Self { queue, connectivity, publisher, scheduler })
    }

    /// Start the background drain scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] when already started.
    pub async fn start(&mut self) -> Result<()> {
        self.scheduler.start().await?;
        // Pick up any restored backlog without waiting for the poll tick
        self.connectivity.request_drain();
        Ok(())
    }

    /// Stop the background drain scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRunning`] when not started.
    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler.stop().await
    }

    /// True while the background scheduler is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Queue an action for delivery and return its id. Always succeeds;
    /// when online and idle this also triggers a drain.
    pub async fn enqueue(
        &self,
        kind: ActionKind,
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Value,
        max_retries: Option<u32>,
    ) -> String {
        let id = self.queue.enqueue(kind, entity, entity_id, payload, max_retries).await;
        self.connectivity.request_drain();
        id
    }

    /// Record a platform connectivity transition. Going online triggers a
    /// drain; any change republishes the status.
    pub fn set_online(&self, online: bool) {
        if self.connectivity.set_online(online) {
            self.queue.publish_status();
        }
    }

    /// Record an app foreground-resume transition.
    pub fn foreground_resumed(&self) {
        self.connectivity.foreground_resumed();
    }

    /// Manually request a drain attempt.
    pub fn trigger_drain(&self) {
        self.connectivity.request_drain();
    }

    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Aggregate status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.queue.status()
    }

    /// Register a status listener. Dropping the handle unsubscribes.
    pub fn subscribe(&self, listener: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Subscription {
        self.publisher.subscribe(listener)
    }

    /// Actions still awaiting delivery, in enqueue order.
    pub fn list_pending(&self) -> Vec<Action> {
        self.queue.list_pending()
    }

    /// All stored actions for one logical entity.
    pub fn list_by_entity(&self, entity: &str) -> Vec<Action> {
        self.queue.list_by_entity(entity)
    }

    /// Snapshot of one action by id.
    pub fn get(&self, id: &str) -> Option<Action> {
        self.queue.get(id)
    }

    /// Drop all failed actions. Returns how many were removed.
    pub async fn clear_failed(&self) -> usize {
        self.queue.clear_failed().await
    }

    /// Drop every stored action. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        self.queue.clear_all().await
    }

    /// Give one failed action another delivery attempt. Returns false when
    /// the id is unknown or the action is not failed.
    pub async fn retry_failed(&self, id: &str) -> bool {
        if self.queue.retry_failed(id).await {
            self.connectivity.request_drain();
            true
        } else {
            false
        }
    }
}
