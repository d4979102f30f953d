//! Error types for engine operations
//!
//! Covers factory loading, failed engine calls and the filesystem
//! primitives exposed by an engine instance.

use thiserror::Error;

/// Errors that can occur while talking to the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine factory could not be loaded
    #[error("Failed to load engine factory: {0}")]
    FactoryLoadFailed(String),

    /// An engine call failed outright (as opposed to returning a nonzero code)
    #[error("Engine call '{call}' failed: {reason}")]
    CallFailed { call: &'static str, reason: String },

    /// Path does not exist in the engine filesystem
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// Path exists but is a directory
    #[error("Is a directory: {0}")]
    IsDirectory(String),

    /// A path component is a regular file
    #[error("Not a directory: {0}")]
    NotDirectory(String),

    /// Any other filesystem failure
    #[error("Engine filesystem error at '{path}': {reason}")]
    Filesystem { path: String, reason: String },

    /// Shared state lock was poisoned by a panicking thread
    #[error("Engine state lock poisoned")]
    LockPoisoned,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
