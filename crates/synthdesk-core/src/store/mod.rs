//! Document/metadata store collaborator
//!
//! The session controller never owns persistence. It reads full snapshots
//! from a [`ProjectStore`] when the local cache is stale and replaces its
//! cached copy wholesale; there are no partial or merge semantics.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use crate::project::{Document, LastModified, Project, ProjectId, ProjectTargets};

/// Errors reported by a project store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Project does not exist in the store
    #[error("Project '{0}' not found in store")]
    ProjectNotFound(ProjectId),

    /// Backend failure (network, permissions, decoding)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Authoritative source of project data
///
/// Every call returns a complete snapshot of the requested part.
pub trait ProjectStore: Send + Sync {
    /// Project metadata, including the marker captured with it
    fn get_project(&self, id: &ProjectId) -> StoreResult<Project>;

    /// Every document of the project
    fn get_documents(&self, id: &ProjectId) -> StoreResult<Vec<Document>>;

    /// Compile targets of the project
    fn get_targets(&self, id: &ProjectId) -> StoreResult<ProjectTargets>;

    /// Authoritative last-modified marker, if one was ever recorded
    fn get_last_modified(&self, id: &ProjectId) -> StoreResult<Option<LastModified>>;
}
