//! # Offsync Engine
//!
//! Durable offline action queue with connectivity-driven synchronization.
//!
//! Actions enqueued while offline are persisted through a [`BlobStore`]
//! and delivered through an [`ActionTransport`] once connectivity returns.
//! Delivery is strictly ordered, single-flight, and retried a bounded
//! number of times with a flat delay.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use offsync_domain::{ActionKind, EngineConfig};
//! use offsync_engine::{MemoryBlobStore, SyncEngine};
//! # use offsync_core::ActionTransport;
//! # use offsync_domain::{Action, Result};
//! # struct HttpTransport;
//! # #[async_trait::async_trait]
//! # impl ActionTransport for HttpTransport {
//! #     async fn execute(&self, _action: &Action) -> Result<()> { Ok(()) }
//! # }
//!
//! # async fn run() -> offsync_domain::Result<()> {
//! let transport = Arc::new(HttpTransport);
//! let store = Arc::new(MemoryBlobStore::new());
//!
//! let mut engine = SyncEngine::new(EngineConfig::default(), transport, store).await?;
//! engine.start().await?;
//!
//! let _sub = engine.subscribe(|status| {
//!     println!("pending: {}", status.pending_count);
//! });
//!
//! engine
//!     .enqueue(
//!         ActionKind::Create,
//!         "package",
//!         "pkg-42",
//!         serde_json::json!({ "status": "delivered" }),
//!         None,
//!     )
//!     .await;
//!
//! engine.set_online(false); // queued work waits
//! engine.set_online(true); // drain resumes automatically
//!
//! engine.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod connectivity;
pub mod engine;
pub mod persistence;
pub mod publisher;
pub mod queue;
pub mod scheduler;
pub mod stores;

// Re-export the primary surface
pub use connectivity::ConnectivityMonitor;
pub use engine::SyncEngine;
pub use persistence::PersistenceAdapter;
pub use publisher::{StatusPublisher, Subscription};
pub use queue::ActionQueue;
pub use scheduler::SyncScheduler;
pub use stores::{FileBlobStore, MemoryBlobStore};

#[doc(no_inline)]
pub use offsync_core::{ActionTransport, BlobStore};
