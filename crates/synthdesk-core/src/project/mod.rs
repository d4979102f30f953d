//! Project document model
//!
//! Projects own a flat mapping of documents. Folders are documents too; a
//! document's `path` lists the ids of its ancestor folders (root to leaf), so
//! the engine-visible filesystem path has to be resolved against the mapping.

mod path;
mod types;

pub use path::{join_segments, resolve_path};
pub use types::{
    Document, DocumentContent, DocumentId, DocumentKind, LastModified, Project, ProjectId,
    ProjectSnapshot, ProjectTargets, Target,
};
