//! Single-flight drain scheduler.
//!
//! Owns the background task that waits on the drain signal (connectivity
//! restore, foreground resume, manual trigger) or the poll interval, and
//! runs at most one drain at a time. Lifecycle follows the worker rules
//! used elsewhere in the workspace: the join handle is tracked,
//! cancellation is explicit, and stop waits with a timeout.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use offsync_core::{ActionTransport, RetryDecision, RetryPolicy};
use offsync_domain::{EngineConfig, EngineError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connectivity::ConnectivityMonitor;
use crate::queue::{ActionQueue, SyncFlags};

/// Shared context for the drain loop.
#[derive(Clone)]
pub(crate) struct DrainContext {
    pub(crate) queue: ActionQueue,
    pub(crate) transport: Arc<dyn ActionTransport>,
    pub(crate) connectivity: Arc<ConnectivityMonitor>,
    pub(crate) flags: Arc<SyncFlags>,
    pub(crate) policy: RetryPolicy,
    pub(crate) poll_interval: Duration,
    pub(crate) success_retention: Duration,
}

/// Connectivity-driven scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    ctx: DrainContext,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl SyncScheduler {
    pub(crate) fn new(
        queue: ActionQueue,
        transport: Arc<dyn ActionTransport>,
        connectivity: Arc<ConnectivityMonitor>,
        flags: Arc<SyncFlags>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            ctx: DrainContext {
                queue,
                transport,
                connectivity,
                flags,
                policy: RetryPolicy::new(config.retry_delay),
                poll_interval: config.poll_interval,
                success_retention: config.success_retention,
            },
            cancellation: CancellationToken::new(),
            task_handle: None,
            join_timeout: config.join_timeout,
        }
    }

    /// Start the scheduler, spawning the background drain loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRunning`] when already started.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }

        info!("Starting sync scheduler");

        // Fresh token so the scheduler can be restarted after a stop
        self.cancellation = CancellationToken::new();

        let ctx = self.ctx.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(ctx, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the drain loop to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRunning`] when not started, or
    /// [`EngineError::Internal`] when the task panics or misses the join
    /// timeout.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }

        info!("Stopping sync scheduler");
        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "Scheduler task panicked");
                    return Err(EngineError::Internal("scheduler task panicked".to_string()));
                }
                Err(_) => {
                    warn!("Scheduler task did not complete within join timeout");
                    return Err(EngineError::Internal("scheduler join timeout".to_string()));
                }
            }
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Returns true while the background drain loop is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn run_loop(ctx: DrainContext, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Drain loop cancelled");
                    break;
                }
                _ = ctx.connectivity.drain_signal() => {}
                _ = tokio::time::sleep(ctx.poll_interval) => {}
            }

            Self::drain(&ctx, &cancel).await;
        }
    }

    /// Run one drain to completion.
    ///
    /// Idempotent no-op when offline, already draining, or nothing is
    /// eligible. Dispatches sequentially in enqueue order, re-checking
    /// connectivity before each action; retryable failures are re-attempted
    /// after the flat retry delay while the single-flight flag stays held,
    /// so concurrent triggers coalesce.
    pub(crate) async fn drain(ctx: &DrainContext, cancel: &CancellationToken) {
        if !ctx.connectivity.is_online() {
            debug!("Skipping drain: offline");
            return;
        }

        if ctx
            .flags
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Drain already in progress; coalescing");
            return;
        }

        if ctx.queue.drain_batch().is_empty() {
            ctx.flags.syncing.store(false, Ordering::SeqCst);
            return;
        }

        debug!("Drain started");
        ctx.queue.publish_status();

        let mut delivered = 0usize;
        'drain: loop {
            let batch = ctx.queue.drain_batch();
            if batch.is_empty() {
                break;
            }

            let mut retry_scheduled = false;
            for id in batch {
                if cancel.is_cancelled() {
                    break 'drain;
                }
                // Connectivity can drop mid-drain; untouched actions stay
                // pending for the next trigger.
                if !ctx.connectivity.is_online() {
                    info!("Connectivity lost mid-drain; aborting");
                    break 'drain;
                }

                let Some(action) = ctx.queue.get(&id) else {
                    continue; // removed since the batch snapshot
                };
                if !action.is_eligible() {
                    continue;
                }

                ctx.queue.update(&id, |a| a.mark_syncing()).await;

                match ctx.transport.execute(&action).await {
                    Ok(()) => {
                        delivered += 1;
                        debug!(id = %id, entity = %action.entity, "Action delivered");
                        ctx.queue.update(&id, |a| a.mark_synced()).await;
                        Self::schedule_prune(ctx, cancel, id);
                    }
                    Err(err) => {
                        let message = err.to_string();
                        match ctx.policy.after_failure(action.retry_count, action.max_retries) {
                            RetryDecision::RetryAfter(_) => {
                                debug!(
                                    id = %id,
                                    error = %message,
                                    retry_count = action.retry_count + 1,
                                    "Attempt failed; will retry"
                                );
                                ctx.queue
                                    .update(&id, |a| a.record_retryable_failure(&message))
                                    .await;
                                retry_scheduled = true;
                            }
                            RetryDecision::Exhausted => {
                                warn!(id = %id, error = %message, "Retries exhausted; marking failed");
                                ctx.queue.update(&id, |a| a.mark_failed(&message)).await;
                            }
                        }
                    }
                }
            }

            if !retry_scheduled {
                break;
            }

            // Flat delay before the next pass over retryable failures
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(ctx.policy.delay()) => {}
            }
            if !ctx.connectivity.is_online() {
                break;
            }
        }

        if delivered > 0 {
            *ctx.flags.last_sync.lock() = Some(Utc::now());
        }

        ctx.flags.syncing.store(false, Ordering::SeqCst);
        ctx.queue.publish_status();
        debug!(delivered = delivered, "Drain finished");
    }

    /// Remove a delivered action once its grace window expires, so the UI
    /// can show a transient "synced" state first.
    fn schedule_prune(ctx: &DrainContext, cancel: &CancellationToken, id: String) {
        let queue = ctx.queue.clone();
        let retention = ctx.success_retention;
        let cancel = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(retention) => {
                    queue.remove(&id).await;
                }
            }
        });
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}
