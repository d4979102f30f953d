//! In-memory engine filesystem
//!
//! A minimal [`EngineFs`] for engine adapters that keep their filesystem in
//! process, and for tooling that wants to preview a project projection
//! without an engine.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::error::{EngineError, EngineResult};
use super::handle::{EngineFs, FileStat};

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    File(Vec<u8>),
}

/// Normalize to an absolute path without duplicate or trailing separators
pub(crate) fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Filesystem held entirely in memory
#[derive(Debug)]
pub struct MemoryFs {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("/".to_string(), Entry::Dir);
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Contents of a file
    pub fn read_file(&self, path: &str) -> EngineResult<Vec<u8>> {
        let path = normalize(path);
        let entries = self.entries.read().map_err(|_| EngineError::LockPoisoned)?;
        match entries.get(&path) {
            Some(Entry::File(data)) => Ok(data.clone()),
            Some(Entry::Dir) => Err(EngineError::IsDirectory(path)),
            None => Err(EngineError::NotFound(path)),
        }
    }

    /// Number of entries, directories included (root excluded)
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|entries| entries.len().saturating_sub(1))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require_parent_dir(entries: &BTreeMap<String, Entry>, path: &str) -> EngineResult<()> {
        let parent = parent_of(path);
        match entries.get(parent) {
            Some(Entry::Dir) => Ok(()),
            Some(Entry::File(_)) => Err(EngineError::NotDirectory(parent.to_string())),
            None => Err(EngineError::NotFound(parent.to_string())),
        }
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFs for MemoryFs {
    fn read_dir(&self, path: &str) -> EngineResult<Vec<String>> {
        let path = normalize(path);
        let entries = self.entries.read().map_err(|_| EngineError::LockPoisoned)?;
        match entries.get(&path) {
            Some(Entry::Dir) => {}
            Some(Entry::File(_)) => return Err(EngineError::NotDirectory(path)),
            None => return Err(EngineError::NotFound(path)),
        }

        let names = entries
            .keys()
            .filter(|key| key.as_str() != path && parent_of(key) == path)
            .filter_map(|key| key.rsplit('/').next())
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    fn stat(&self, path: &str) -> EngineResult<FileStat> {
        let path = normalize(path);
        let entries = self.entries.read().map_err(|_| EngineError::LockPoisoned)?;
        match entries.get(&path) {
            Some(Entry::Dir) => Ok(FileStat {
                size: 0,
                is_dir: true,
            }),
            Some(Entry::File(data)) => Ok(FileStat {
                size: data.len() as u64,
                is_dir: false,
            }),
            None => Err(EngineError::NotFound(path)),
        }
    }

    fn write_file(&self, path: &str, data: &[u8]) -> EngineResult<()> {
        let path = normalize(path);
        let mut entries = self.entries.write().map_err(|_| EngineError::LockPoisoned)?;
        if let Some(Entry::Dir) = entries.get(&path) {
            return Err(EngineError::IsDirectory(path));
        }
        Self::require_parent_dir(&entries, &path)?;
        entries.insert(path, Entry::File(data.to_vec()));
        Ok(())
    }

    fn mkdir(&self, path: &str) -> EngineResult<()> {
        let path = normalize(path);
        let mut entries = self.entries.write().map_err(|_| EngineError::LockPoisoned)?;
        match entries.get(&path) {
            Some(Entry::Dir) => return Ok(()),
            Some(Entry::File(_)) => {
                return Err(EngineError::Filesystem {
                    path,
                    reason: "file exists".to_string(),
                })
            }
            None => {}
        }
        Self::require_parent_dir(&entries, &path)?;
        entries.insert(path, Entry::Dir);
        Ok(())
    }
}
