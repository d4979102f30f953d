//! Project → engine filesystem synchronization
//!
//! Projects every document of a cached project into the engine's private
//! filesystem at its resolved path:
//! - Folder documents become directories
//! - File and binary documents are written byte-for-byte
//! - Intermediate directories are created as needed
//!
//! Sync is idempotent: running it again on an unchanged project leaves the
//! filesystem exactly as it was. It runs to completion (or fails) before the
//! pipeline compiles anything.

mod tree;

pub use tree::{snapshot_tree, FsSnapshot};

use thiserror::Error;

use crate::engine::{normalize, EngineError, EngineFs};
use crate::project::ProjectSnapshot;

/// A document could not be written into the engine filesystem
#[derive(Debug, Error)]
#[error("Failed to sync '{path}' into engine filesystem: {source}")]
pub struct SyncError {
    pub path: String,
    #[source]
    pub source: EngineError,
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Summary of a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files written (new or overwritten)
    pub files: usize,
    /// Folder documents projected as directories
    pub folders: usize,
    /// Total bytes written
    pub bytes: u64,
}

/// Create `path` and every missing parent directory
pub fn mkdir_all(fs: &dyn EngineFs, path: &str) -> SyncResult<()> {
    let mut prefix = String::new();
    for part in path.split('/').filter(|part| !part.is_empty()) {
        prefix.push('/');
        prefix.push_str(part);
        if fs.is_directory(&prefix) {
            continue;
        }
        fs.mkdir(&prefix).map_err(|source| SyncError {
            path: prefix.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Write every document of `snapshot` into `fs`
///
/// Documents are processed one at a time in resolved-path order. The first
/// failure aborts the sync.
pub fn sync_project(fs: &dyn EngineFs, snapshot: &ProjectSnapshot) -> SyncResult<SyncReport> {
    let mut entries: Vec<_> = snapshot
        .documents
        .values()
        .map(|doc| (snapshot.resolve_path(doc), doc))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut report = SyncReport::default();
    for (path, document) in entries {
        if document.is_folder() {
            mkdir_all(fs, &path)?;
            report.folders += 1;
            continue;
        }

        if let Some((parent, _)) = path.rsplit_once('/') {
            mkdir_all(fs, parent)?;
        }

        let data = document.content.as_bytes();
        fs.write_file(&path, data).map_err(|source| SyncError {
            path: normalize(&path),
            source,
        })?;
        log::debug!("[SYNC] Wrote {} ({} bytes)", path, data.len());

        report.files += 1;
        report.bytes += data.len() as u64;
    }

    log::info!(
        "[SYNC] Project {}: {} files ({} bytes), {} folders",
        snapshot.id(),
        report.files,
        report.bytes,
        report.folders
    );

    Ok(report)
}
