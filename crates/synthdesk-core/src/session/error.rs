//! Error types for the playback/render pipeline

use std::fmt;

use thiserror::Error;

use crate::cache::StaleReason;
use crate::engine::EngineError;
use crate::project::ProjectId;
use crate::store::StoreError;
use crate::sync::SyncError;

/// Pipeline stage an engine call failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configure,
    Compile,
    Start,
    Transport,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Compile => write!(f, "compile"),
            Self::Start => write!(f, "start"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

/// Errors surfaced by the session controller
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine factory could not be loaded
    #[error("Engine factory unavailable: {0}")]
    FactoryUnavailable(#[source] EngineError),

    /// The factory produced no engine
    #[error("Engine creation failed: {0}")]
    EngineCreationFailed(String),

    /// A document could not be written into the engine filesystem
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Compilation returned a nonzero result code
    #[error("Compilation failed with result code {0}")]
    CompileFailed(i32),

    /// Start returned a nonzero result code
    #[error("Engine start failed with result code {0}")]
    StartFailed(i32),

    /// An engine call could not be made at all
    #[error("Engine call failed during {stage}: {source}")]
    Engine {
        stage: PipelineStage,
        #[source]
        source: EngineError,
    },

    /// Project is not available locally
    #[error("Project '{0}' is not loaded")]
    MissingProject(ProjectId),

    /// Project has no usable target (or its document is gone)
    #[error("No target was found for project '{0}'")]
    MissingTarget(ProjectId),

    /// Project is still stale after one refresh
    #[error("Project '{project}' is still stale after refresh: {reason}")]
    StillStale {
        project: ProjectId,
        reason: StaleReason,
    },

    /// The document store failed during a refresh
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Sync failures propagate to the caller without touching play state
    pub fn is_sync_failure(&self) -> bool {
        matches!(self, Self::Sync(_))
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
