//! In-process project store
//!
//! Holds project snapshots in memory. Used for local (offline) projects,
//! the inspect tool and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{ProjectStore, StoreError, StoreResult};
use crate::project::{Document, LastModified, Project, ProjectId, ProjectSnapshot, ProjectTargets};

#[derive(Debug, Clone)]
struct StoredProject {
    snapshot: ProjectSnapshot,
    last_modified: Option<LastModified>,
}

/// Project store backed by a map of snapshots
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<ProjectId, StoredProject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project
    ///
    /// The project's captured marker is aligned with `last_modified`, as a
    /// consistent backend would do.
    pub fn insert(&self, mut snapshot: ProjectSnapshot, last_modified: Option<LastModified>) {
        snapshot.project.cached_last_modified = last_modified;
        if let Ok(mut projects) = self.projects.write() {
            projects.insert(
                snapshot.id().clone(),
                StoredProject {
                    snapshot,
                    last_modified,
                },
            );
        }
    }

    /// Record a modification: bumps both the project's marker and the
    /// authoritative last-modified record
    pub fn touch(&self, id: &ProjectId, last_modified: LastModified) {
        if let Ok(mut projects) = self.projects.write() {
            if let Some(stored) = projects.get_mut(id) {
                stored.snapshot.project.cached_last_modified = Some(last_modified);
                stored.last_modified = Some(last_modified);
            }
        }
    }

    /// Replace a document of a stored project
    pub fn put_document(&self, id: &ProjectId, document: Document) {
        if let Ok(mut projects) = self.projects.write() {
            if let Some(stored) = projects.get_mut(id) {
                stored
                    .snapshot
                    .documents
                    .insert(document.id.clone(), document);
            }
        }
    }

    /// Overwrite only the authoritative marker, leaving the project's captured
    /// marker untouched (an inconsistent backend)
    pub fn set_last_modified(&self, id: &ProjectId, last_modified: Option<LastModified>) {
        if let Ok(mut projects) = self.projects.write() {
            if let Some(stored) = projects.get_mut(id) {
                stored.last_modified = last_modified;
            }
        }
    }

    fn with_project<T>(
        &self,
        id: &ProjectId,
        f: impl FnOnce(&StoredProject) -> T,
    ) -> StoreResult<T> {
        let projects = self
            .projects
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        projects
            .get(id)
            .map(f)
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }
}

impl ProjectStore for MemoryStore {
    fn get_project(&self, id: &ProjectId) -> StoreResult<Project> {
        self.with_project(id, |stored| stored.snapshot.project.clone())
    }

    fn get_documents(&self, id: &ProjectId) -> StoreResult<Vec<Document>> {
        self.with_project(id, |stored| {
            stored.snapshot.documents.values().cloned().collect()
        })
    }

    fn get_targets(&self, id: &ProjectId) -> StoreResult<ProjectTargets> {
        self.with_project(id, |stored| stored.snapshot.targets.clone())
    }

    fn get_last_modified(&self, id: &ProjectId) -> StoreResult<Option<LastModified>> {
        self.with_project(id, |stored| stored.last_modified)
    }
}
