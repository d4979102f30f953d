//! Core project types shared across the session controller

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::path::resolve_path;

/// Unique project identifier (document store key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique document identifier within a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-modified marker for a project
///
/// Only ever compared for equality. Comparison uses the full nanosecond
/// resolution of the underlying timestamp, so markers one millisecond apart
/// are different markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LastModified(DateTime<Utc>);

impl LastModified {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Marker for the current wall-clock time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build a marker from milliseconds since the Unix epoch
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Build a marker from nanoseconds since the Unix epoch
    pub fn from_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for LastModified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// What kind of entry a document is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Editable text document
    #[default]
    File,
    /// Folder; only its name matters, it has no content
    Folder,
    /// Uploaded binary asset (samples, tables)
    Binary,
}

/// Current value of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentContent {
    Text(String),
    Binary(Vec<u8>),
}

impl DocumentContent {
    /// Raw bytes as they should land in the engine filesystem
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Content as text, lossily decoding binary content
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocumentContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A single document owned by a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// File (or folder) name, never contains path separators
    pub filename: String,
    /// Ancestor folder ids, root to leaf
    #[serde(default)]
    pub path: Vec<DocumentId>,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub content: DocumentContent,
    /// Creation metadata, immutable once the document exists
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Document {
    /// Text document at the project root
    pub fn file(id: impl Into<String>, filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            filename: filename.into(),
            path: Vec::new(),
            kind: DocumentKind::File,
            content: DocumentContent::Text(text.into()),
            created: None,
            created_by: None,
        }
    }

    /// Folder document at the project root
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Folder,
            content: DocumentContent::default(),
            ..Self::file(id, name, "")
        }
    }

    /// Binary asset at the project root
    pub fn binary(id: impl Into<String>, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind: DocumentKind::Binary,
            content: DocumentContent::Binary(bytes),
            ..Self::file(id, filename, "")
        }
    }

    /// Move the document under the given ancestor folders (root to leaf)
    pub fn in_folders<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = ancestors.into_iter().map(DocumentId::new).collect();
        self
    }

    /// Folder name used when this document appears as an ancestor
    pub fn name(&self) -> &str {
        &self.filename
    }

    pub fn is_folder(&self) -> bool {
        self.kind == DocumentKind::Folder
    }
}

/// Project metadata as held by the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub public: bool,
    /// Last-modified marker captured together with this snapshot
    #[serde(default)]
    pub cached_last_modified: Option<LastModified>,
}

/// A named compile entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    /// Target type, e.g. "main"
    #[serde(default = "default_target_kind")]
    pub kind: String,
    pub document_id: DocumentId,
    /// Extra engine options for this target
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_target_kind() -> String {
    "main".to_string()
}

impl Target {
    pub fn main(name: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_target_kind(),
            document_id: DocumentId::new(document_id),
            options: Vec::new(),
        }
    }
}

/// All compile targets of a project plus the designated default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTargets {
    #[serde(default)]
    pub default_target: Option<String>,
    #[serde(default)]
    pub targets: HashMap<String, Target>,
}

impl ProjectTargets {
    /// Targets containing a single default entry
    pub fn single(target: Target) -> Self {
        let name = target.name.clone();
        let mut targets = HashMap::new();
        targets.insert(name.clone(), target);
        Self {
            default_target: Some(name),
            targets,
        }
    }

    /// Resolve an explicitly selected target, falling back to the default
    pub fn resolve(&self, selected: Option<&str>) -> Option<&Target> {
        let name = selected.or(self.default_target.as_deref())?;
        self.targets.get(name)
    }
}

/// Everything cached locally about one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: Project,
    #[serde(default)]
    pub documents: HashMap<DocumentId, Document>,
    #[serde(default)]
    pub targets: ProjectTargets,
}

impl ProjectSnapshot {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            documents: HashMap::new(),
            targets: ProjectTargets::default(),
        }
    }

    /// Add a document, keyed by its id
    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.insert(document.id.clone(), document);
        self
    }

    pub fn with_targets(mut self, targets: ProjectTargets) -> Self {
        self.targets = targets;
        self
    }

    pub fn id(&self) -> &ProjectId {
        &self.project.id
    }

    /// Engine filesystem path of a document of this project
    pub fn resolve_path(&self, document: &Document) -> String {
        resolve_path(document, &self.documents)
    }

    /// Resolve the selected (or default) target and the document it compiles
    pub fn target_document(&self, selected: Option<&str>) -> Option<(&Target, &Document)> {
        let target = self.targets.resolve(selected)?;
        let document = self.documents.get(&target.document_id)?;
        Some((target, document))
    }
}
