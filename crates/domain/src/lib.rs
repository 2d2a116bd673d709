//! # Offsync Domain
//!
//! Data types and models for the offsync engine.
//!
//! This crate contains:
//! - Queued mutation types (`Action`, `ActionKind`, `ActionStatus`)
//! - The aggregate `SyncStatus` published to subscribers
//! - Engine configuration
//! - Error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other offsync crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod action;
pub mod config;
pub mod errors;
pub mod status;

// Re-export commonly used items
pub use action::{Action, ActionKind, ActionStatus};
pub use config::EngineConfig;
pub use errors::{EngineError, Result};
pub use status::SyncStatus;
