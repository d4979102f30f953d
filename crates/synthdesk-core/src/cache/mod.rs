//! Local project cache and its validity gate
//!
//! # Architecture
//!
//! ```text
//! ProjectStore (authoritative)
//!     │  full-replace downloads
//!     ▼
//! ProjectCache ──► CacheGate::check_freshness()   ← playback pipeline
//!     │
//!     └─► snapshot()                              ← sync, target resolution
//! ```
//!
//! The cache holds four independently replaced parts per project: metadata
//! (with the marker captured alongside it), documents, targets and the locally
//! held authoritative last-modified marker.

mod gate;

pub use gate::{CacheGate, Freshness, RefreshOutcome, StaleReason};

use std::collections::HashMap;
use std::sync::RwLock;

use crate::project::{Document, DocumentId, LastModified, Project, ProjectId, ProjectSnapshot, ProjectTargets};

#[derive(Debug, Default)]
struct CacheState {
    projects: HashMap<ProjectId, Project>,
    documents: HashMap<ProjectId, HashMap<DocumentId, Document>>,
    targets: HashMap<ProjectId, ProjectTargets>,
    last_modified: HashMap<ProjectId, LastModified>,
}

/// In-memory cache of downloaded project data
///
/// Readers always get owned snapshots; nothing hands out references that
/// would outlive a concurrent refresh.
#[derive(Debug, Default)]
pub struct ProjectCache {
    state: RwLock<CacheState>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with a complete snapshot and marker
    pub fn insert_snapshot(&self, snapshot: ProjectSnapshot, last_modified: Option<LastModified>) {
        let id = snapshot.id().clone();
        self.store_project(snapshot.project);
        self.store_documents(&id, snapshot.documents.into_values().collect());
        self.store_targets(&id, snapshot.targets);
        self.store_last_modified(&id, last_modified);
    }

    /// Replace the cached project metadata
    pub fn store_project(&self, project: Project) {
        if let Ok(mut state) = self.state.write() {
            log::debug!("[CACHE] Stored project {}", project.id);
            state.projects.insert(project.id.clone(), project);
        }
    }

    /// Replace the full document set of a project
    pub fn store_documents(&self, id: &ProjectId, documents: Vec<Document>) {
        if let Ok(mut state) = self.state.write() {
            let mapping: HashMap<_, _> = documents
                .into_iter()
                .map(|doc| (doc.id.clone(), doc))
                .collect();
            log::debug!("[CACHE] Stored {} documents for {}", mapping.len(), id);
            state.documents.insert(id.clone(), mapping);
        }
    }

    /// Replace the compile targets of a project
    pub fn store_targets(&self, id: &ProjectId, targets: ProjectTargets) {
        if let Ok(mut state) = self.state.write() {
            state.targets.insert(id.clone(), targets);
        }
    }

    /// Replace (or clear) the locally held authoritative marker
    pub fn store_last_modified(&self, id: &ProjectId, last_modified: Option<LastModified>) {
        if let Ok(mut state) = self.state.write() {
            match last_modified {
                Some(marker) => {
                    state.last_modified.insert(id.clone(), marker);
                }
                None => {
                    state.last_modified.remove(id);
                }
            }
        }
    }

    /// Drop everything cached for a project
    pub fn evict(&self, id: &ProjectId) {
        if let Ok(mut state) = self.state.write() {
            state.projects.remove(id);
            state.documents.remove(id);
            state.targets.remove(id);
            state.last_modified.remove(id);
            log::info!("[CACHE] Evicted project {}", id);
        }
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.state
            .read()
            .map(|state| state.projects.contains_key(id))
            .unwrap_or(false)
    }

    /// Marker captured alongside the cached project metadata
    pub fn cached_marker(&self, id: &ProjectId) -> Option<LastModified> {
        let state = self.state.read().ok()?;
        state.projects.get(id)?.cached_last_modified
    }

    /// Locally held authoritative marker
    pub fn last_modified(&self, id: &ProjectId) -> Option<LastModified> {
        let state = self.state.read().ok()?;
        state.last_modified.get(id).copied()
    }

    /// Owned snapshot of a cached project
    ///
    /// `None` when no project metadata is cached. Missing documents or targets
    /// yield empty collections.
    pub fn snapshot(&self, id: &ProjectId) -> Option<ProjectSnapshot> {
        let state = self.state.read().ok()?;
        let project = state.projects.get(id)?.clone();
        Some(ProjectSnapshot {
            project,
            documents: state.documents.get(id).cloned().unwrap_or_default(),
            targets: state.targets.get(id).cloned().unwrap_or_default(),
        })
    }
}
