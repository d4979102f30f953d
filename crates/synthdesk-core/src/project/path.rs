//! Engine filesystem path resolution
//!
//! Documents store their location as a chain of folder ids rather than a
//! filesystem path. Resolution looks every ancestor up in the project's
//! document mapping. It is best-effort: an ancestor that no longer exists is
//! skipped, so a corrupt folder reference degrades to a flatter path instead
//! of blocking playback.

use std::collections::HashMap;

use super::types::{Document, DocumentId};

/// Resolve the engine filesystem path for `document`
///
/// An empty ancestor path yields exactly `document.filename`. Otherwise the
/// ancestor folder names are joined with `/`, followed by the filename, with
/// duplicate separators collapsed.
pub fn resolve_path(document: &Document, documents: &HashMap<DocumentId, Document>) -> String {
    if document.path.is_empty() {
        return document.filename.clone();
    }

    let mut segments: Vec<&str> = Vec::with_capacity(document.path.len() + 1);
    for ancestor in &document.path {
        match documents.get(ancestor) {
            Some(folder) => segments.push(folder.name()),
            None => {
                log::warn!(
                    "[PATH] Document {} references missing folder {}, skipping it",
                    document.id,
                    ancestor
                );
            }
        }
    }
    segments.push(&document.filename);

    join_segments(segments)
}

/// Join path segments with `/`, dropping empty components
///
/// Leading separators are not preserved: the result is always relative.
pub fn join_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    segments
        .into_iter()
        .flat_map(|segment| segment.split('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
