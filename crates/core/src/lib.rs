//! # Offsync Core
//!
//! Port interfaces and pure decision logic for the offsync engine.
//!
//! This crate contains:
//! - The transport and durable-storage seams (`ActionTransport`, `BlobStore`)
//! - The pure retry policy
//!
//! ## Architecture
//! - Depends only on `offsync-domain`
//! - No I/O; implementations live in `offsync-engine` or with the integrator

pub mod ports;
pub mod retry;

// Re-export commonly used items
pub use ports::{ActionTransport, BlobStore};
pub use retry::{RetryDecision, RetryPolicy};
