//! Port interfaces for the sync engine

use async_trait::async_trait;
use offsync_domain::{Action, Result};

/// Transport collaborator that replays one action against the remote system.
///
/// Supplied by the integrator. The engine imposes no timeout of its own: a
/// call must resolve to success or failure within bounded time, and must be
/// idempotency-safe when the same action is retried after a failure.
#[async_trait]
pub trait ActionTransport: Send + Sync {
    /// Execute a single action. An `Err` is recorded as the action's
    /// `last_error`; the engine does not distinguish transient from
    /// permanent failures (use `max_retries = 0` for do-not-retry actions).
    async fn execute(&self, action: &Action) -> Result<()>;
}

/// Durable key-value store holding the serialized queue as one opaque blob.
///
/// The engine only needs atomic get/set of a single key; the concrete
/// backend can be a file, an embedded database, or browser storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the blob stored under `key`.
    async fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;
}
