//! Engine filesystem tree snapshots
//!
//! Used to record what the engine filesystem looked like before a render,
//! so the result presenter can tell which files the render produced.

use std::collections::BTreeMap;

use crate::engine::{EngineFs, EngineResult};

/// Absolute file path → size in bytes. Directories are recursed, not listed.
pub type FsSnapshot = BTreeMap<String, u64>;

/// Walk the whole engine filesystem from the root
pub fn snapshot_tree(fs: &dyn EngineFs) -> EngineResult<FsSnapshot> {
    let mut tree = FsSnapshot::new();
    walk(fs, "/", &mut tree)?;
    Ok(tree)
}

fn walk(fs: &dyn EngineFs, dir: &str, tree: &mut FsSnapshot) -> EngineResult<()> {
    for name in fs.read_dir(dir)? {
        let path = if dir.ends_with('/') {
            format!("{}{}", dir, name)
        } else {
            format!("{}/{}", dir, name)
        };

        let stat = fs.stat(&path)?;
        if stat.is_dir {
            walk(fs, &path, tree)?;
        } else {
            tree.insert(path, stat.size);
        }
    }
    Ok(())
}
