//! Error types used throughout the engine

use thiserror::Error;

/// Main error type for offsync operations.
///
/// The queue-facing API never surfaces these to callers: persistence
/// failures are logged and swallowed, and attempt failures are recorded as
/// data on the affected `Action`. Lifecycle methods and the port traits
/// return them directly.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for offsync operations
pub type Result<T> = std::result::Result<T, EngineError>;
