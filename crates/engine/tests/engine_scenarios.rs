//! End-to-end scenarios driving a [`SyncEngine`] through enqueue, drain,
//! retry, connectivity loss, and restart.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offsync_core::{ActionTransport, BlobStore};
use offsync_domain::{Action, ActionKind, ActionStatus, EngineConfig, EngineError, Result, SyncStatus};
use offsync_engine::{MemoryBlobStore, SyncEngine};
use parking_lot::Mutex;
use tokio::sync::Notify;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("offsync_engine=debug").try_init();
}

fn test_config() -> EngineConfig {
    EngineConfig {
        retry_delay: Duration::from_millis(10),
        // Long enough that nothing in these tests is timer-driven
        poll_interval: Duration::from_secs(300),
        success_retention: Duration::from_secs(300),
        ..EngineConfig::default()
    }
}

async fn engine_with(
    transport: Arc<dyn ActionTransport>,
    config: EngineConfig,
) -> (SyncEngine, Arc<MemoryBlobStore>) {
    let store = Arc::new(MemoryBlobStore::new());
    let engine = SyncEngine::new(config, transport, store.clone()).await.unwrap();
    (engine, store)
}

async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Transport whose per-entity outcomes are scripted up front; any attempt
/// past the end of an entity's script succeeds.
struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(scripts: &[(&str, &[bool])]) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(
                scripts
                    .iter()
                    .map(|(id, outcomes)| (id.to_string(), outcomes.iter().copied().collect()))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }

    fn always_ok() -> Arc<Self> {
        Self::new(&[])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionTransport for ScriptedTransport {
    async fn execute(&self, action: &Action) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .scripts
            .lock()
            .get_mut(&action.entity_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(true);
        if outcome {
            Ok(())
        } else {
            Err(EngineError::Transport("503 service unavailable".to_string()))
        }
    }
}

async fn enqueue(engine: &SyncEngine, entity_id: &str) -> String {
    engine
        .enqueue(
            ActionKind::Update,
            "package",
            entity_id,
            serde_json::json!({ "status": "delivered" }),
            None,
        )
        .await
}

#[tokio::test]
async fn drains_enqueued_actions_in_order() {
    init_tracing();
    let transport = ScriptedTransport::always_ok();
    let (mut engine, _) = engine_with(transport.clone(), test_config()).await;
    engine.start().await.unwrap();

    for i in 0..3 {
        enqueue(&engine, &format!("p{i}")).await;
    }

    wait_for("queue to drain", || engine.status().pending_count == 0).await;

    assert_eq!(transport.calls(), 3);
    let status = engine.status();
    assert!(status.last_sync_time.is_some());
    assert_eq!(status.sync_error_count, 0);
    assert!(!status.is_syncing);

    // Delivered actions stay visible for the grace window
    let delivered = engine.list_by_entity("package");
    assert_eq!(delivered.len(), 3);
    assert!(delivered.iter().all(|a| a.status == ActionStatus::Success));

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn exhausted_retries_mark_failed_without_blocking_others() {
    init_tracing();
    let config = EngineConfig { max_retries: 2, ..test_config() };
    // "a" succeeds on the third attempt, "b" immediately, "c" never
    let transport = ScriptedTransport::new(&[
        ("a", &[false, false, true]),
        ("b", &[true]),
        ("c", &[false, false, false]),
    ]);
    let (mut engine, _) = engine_with(transport.clone(), config).await;
    engine.start().await.unwrap();

    let id_a = enqueue(&engine, "a").await;
    let id_b = enqueue(&engine, "b").await;
    let id_c = enqueue(&engine, "c").await;

    wait_for("drain to settle", || {
        let status = engine.status();
        status.pending_count == 0 && status.sync_error_count == 1
    })
    .await;

    let a = engine.get(&id_a).unwrap();
    assert_eq!(a.status, ActionStatus::Success);
    assert_eq!(a.retry_count, 2);
    assert!(a.last_error.is_none());

    let b = engine.get(&id_b).unwrap();
    assert_eq!(b.status, ActionStatus::Success);
    assert_eq!(b.retry_count, 0);

    let c = engine.get(&id_c).unwrap();
    assert_eq!(c.status, ActionStatus::Failed);
    assert_eq!(c.retry_count, c.max_retries);
    assert_eq!(c.last_error.as_deref(), Some("Transport error: 503 service unavailable"));

    // a: 3 attempts, b: 1, c: 3
    assert_eq!(transport.calls(), 7);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_triggers_coalesce_into_one_drain() {
    init_tracing();

    struct SlowTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionTransport for SlowTransport {
        async fn execute(&self, _action: &Action) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(())
        }
    }

    let transport = Arc::new(SlowTransport { calls: AtomicUsize::new(0) });
    let (mut engine, _) = engine_with(transport.clone(), test_config()).await;
    engine.start().await.unwrap();

    for i in 0..3 {
        enqueue(&engine, &format!("p{i}")).await;
    }
    engine.trigger_drain();
    engine.trigger_drain();

    wait_for("queue to drain", || engine.status().pending_count == 0).await;
    // Give any stray coalesced trigger a chance to run an (empty) drain
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn offline_enqueues_wait_for_connectivity() {
    init_tracing();
    let transport = ScriptedTransport::always_ok();
    let (mut engine, _) = engine_with(transport.clone(), test_config()).await;
    engine.start().await.unwrap();

    engine.set_online(false);
    enqueue(&engine, "p0").await;
    enqueue(&engine, "p1").await;
    engine.trigger_drain();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls(), 0);
    assert_eq!(engine.status().pending_count, 2);
    assert!(!engine.status().is_online);

    engine.set_online(true);
    wait_for("drain after reconnect", || engine.status().pending_count == 0).await;
    assert_eq!(transport.calls(), 2);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn connectivity_loss_mid_drain_leaves_the_rest_pending() {
    init_tracing();

    /// Blocks its first call until the test has flipped the engine offline.
    struct HandshakeTransport {
        entered: Notify,
        release: Notify,
        first_call: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionTransport for HandshakeTransport {
        async fn execute(&self, _action: &Action) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.first_call.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(())
        }
    }

    let transport = Arc::new(HandshakeTransport {
        entered: Notify::new(),
        release: Notify::new(),
        first_call: AtomicUsize::new(0),
        calls: AtomicUsize::new(0),
    });
    let (mut engine, _) = engine_with(transport.clone(), test_config()).await;
    engine.start().await.unwrap();

    enqueue(&engine, "a").await;
    enqueue(&engine, "b").await;
    enqueue(&engine, "c").await;

    // First delivery is in flight; drop connectivity, then let it finish
    transport.entered.notified().await;
    engine.set_online(false);
    transport.release.notify_one();

    wait_for("drain to abort", || !engine.status().is_syncing).await;

    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    let status = engine.status();
    assert_eq!(status.pending_count, 2);
    assert_eq!(status.sync_error_count, 0);

    let remaining = engine.list_pending();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|a| a.status == ActionStatus::Pending));

    engine.set_online(true);
    wait_for("drain after reconnect", || engine.status().pending_count == 0).await;
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn persisted_queue_survives_a_restart() {
    init_tracing();
    let transport = ScriptedTransport::always_ok();
    let store = Arc::new(MemoryBlobStore::new());

    {
        let engine =
            SyncEngine::new(test_config(), transport.clone(), store.clone()).await.unwrap();
        engine.set_online(false);
        enqueue(&engine, "p0").await;
        enqueue(&engine, "p1").await;
        // Never started; dropped with the backlog persisted
    }
    assert_eq!(transport.calls(), 0);

    let mut engine = SyncEngine::new(test_config(), transport.clone(), store).await.unwrap();
    let restored = engine.list_pending();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].entity_id, "p0");
    assert_eq!(restored[1].entity_id, "p1");

    engine.start().await.unwrap();
    wait_for("restored backlog to drain", || engine.status().pending_count == 0).await;
    assert_eq!(transport.calls(), 2);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn corrupt_persisted_queue_starts_empty() {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let config = test_config();
    store.set(&config.storage_key, b"not json at all").await.unwrap();

    let engine = SyncEngine::new(config, ScriptedTransport::always_ok(), store).await.unwrap();

    assert!(engine.list_pending().is_empty());
    assert_eq!(engine.status().pending_count, 0);
}

#[tokio::test]
async fn capacity_breach_evicts_the_oldest_pending() {
    init_tracing();
    let config = EngineConfig { max_pending_actions: 2, ..test_config() };
    let (engine, _) = engine_with(ScriptedTransport::always_ok(), config).await;
    engine.set_online(false);

    let first = enqueue(&engine, "p0").await;
    enqueue(&engine, "p1").await;
    enqueue(&engine, "p2").await;

    let pending = engine.list_pending();
    assert_eq!(pending.len(), 2);
    assert!(engine.get(&first).is_none());
    assert_eq!(pending[0].entity_id, "p1");
    assert_eq!(pending[1].entity_id, "p2");
}

#[tokio::test]
async fn retry_failed_grants_exactly_one_more_attempt() {
    init_tracing();
    let transport = ScriptedTransport::new(&[("a", &[false, false])]);
    let config = EngineConfig { max_retries: 0, ..test_config() };
    let (mut engine, _) = engine_with(transport.clone(), config).await;
    engine.start().await.unwrap();

    let id = enqueue(&engine, "a").await;
    wait_for("first failure", || engine.status().sync_error_count == 1).await;
    assert_eq!(transport.calls(), 1);
    assert_eq!(engine.get(&id).unwrap().retry_count, 0);

    assert!(engine.retry_failed(&id).await);
    wait_for("second failure", || {
        engine.get(&id).is_some_and(|a| a.status == ActionStatus::Failed) && transport.calls() == 2
    })
    .await;

    // Unknown ids and non-failed actions are rejected
    assert!(!engine.retry_failed("missing").await);

    assert_eq!(engine.clear_failed().await, 1);
    assert!(engine.get(&id).is_none());

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn subscribers_observe_the_drain_lifecycle() {
    init_tracing();
    let transport = ScriptedTransport::always_ok();
    let (mut engine, _) = engine_with(transport, test_config()).await;
    engine.start().await.unwrap();

    let seen: Arc<Mutex<Vec<SyncStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let sub = engine.subscribe(move |status| {
        seen_clone.lock().push(status.clone());
    });

    enqueue(&engine, "p0").await;
    wait_for("queue to drain", || engine.status().pending_count == 0).await;

    {
        let seen = seen.lock();
        assert!(seen.iter().any(|s| s.pending_count == 1), "enqueue was published");
        assert!(seen.iter().any(|s| s.is_syncing), "drain start was published");
        let last = seen.last().unwrap();
        assert_eq!(last.pending_count, 0);
        assert!(!last.is_syncing);
    }

    sub.unsubscribe();
    let before = seen.lock().len();
    enqueue(&engine, "p1").await;
    wait_for("queue to drain", || engine.status().pending_count == 0).await;
    assert_eq!(seen.lock().len(), before);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn success_retention_prunes_delivered_actions() {
    init_tracing();
    let config = EngineConfig { success_retention: Duration::from_millis(30), ..test_config() };
    let (mut engine, _) = engine_with(ScriptedTransport::always_ok(), config).await;
    engine.start().await.unwrap();

    enqueue(&engine, "p0").await;
    wait_for("delivery", || {
        engine.list_by_entity("package").first().is_some_and(|a| a.status == ActionStatus::Success)
    })
    .await;

    wait_for("grace window to expire", || engine.list_by_entity("package").is_empty()).await;

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = EngineConfig { max_pending_actions: 0, ..EngineConfig::default() };
    let result = SyncEngine::new(
        config,
        ScriptedTransport::always_ok(),
        Arc::new(MemoryBlobStore::new()),
    )
    .await;

    assert!(matches!(result, Err(EngineError::Config(_))));
}
