//! Entry types for the two sides of a sync
//!
//! The Target service describes everything (folders and documents alike)
//! with one flat, versioned record. Depending on where a record came from
//! it carries different extras, so instead of one loosely-typed bag this
//! module splits it into variants that share an identity/version core:
//!
//! - [`DesiredEntry`] - derived from the Source tree by the walker; carries
//!   the ephemeral Source reference (native id + byte size) needed to read
//!   content later.
//! - [`ServerEntry`] - as reported by the Target `list_docs` call; carries
//!   the outcome flags (`Success`/`Message`) and the reading position.
//!
//! Write/delete acknowledgements from the Target API are port-level DTOs
//! ([`crate::ports::target_api::UploadSlot`] and friends), not entities.

use serde::{Deserialize, Serialize};

use super::newtypes::{DocumentId, SourceId, Version};

// ============================================================================
// EntryKind
// ============================================================================

/// What an entry is in the Target's model: a folder or a document.
///
/// Wire values follow the Target service's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A folder; has no content blob and no size limit
    #[serde(rename = "CollectionType")]
    Collection,
    /// A document with binary content
    #[serde(rename = "DocumentType")]
    Document,
}

impl EntryKind {
    /// Returns true for documents
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self, EntryKind::Document)
    }
}

// ============================================================================
// EntryCore
// ============================================================================

/// The identity/version core shared by every entry variant.
///
/// Field wire names mirror the Target's JSON, including its historical
/// `VissibleName` spelling; the cache file persists this shape verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCore {
    /// Stable UUID identity in the Target system
    #[serde(rename = "ID")]
    pub id: DocumentId,
    /// Collection or Document
    #[serde(rename = "Type")]
    pub kind: EntryKind,
    /// Id of the containing collection, or the configured root id
    #[serde(rename = "Parent")]
    pub parent: DocumentId,
    /// Human-readable name, mirrors the Source object name
    #[serde(rename = "VissibleName")]
    pub name: String,
    /// Monotonic entry version
    #[serde(rename = "Version")]
    pub version: Version,
}

impl EntryCore {
    /// Returns true when `name` ends with one of the configured formats.
    ///
    /// Exact suffix match, the way the Target names documents; a folder
    /// never matches regardless of its name.
    #[must_use]
    pub fn matches_format(&self, formats: &[String]) -> bool {
        self.kind.is_document() && formats.iter().any(|ext| self.name.ends_with(ext.as_str()))
    }
}

// ============================================================================
// SourceRef
// ============================================================================

/// Ephemeral reference back to the Source object a desired entry came from.
///
/// Never sent to the Target and never persisted; it exists so later phases
/// can read the blob and check the upload size ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Native Source identifier
    pub id: SourceId,
    /// Byte size as reported by the Source service (0 for folders)
    pub size: u64,
}

// ============================================================================
// DesiredEntry
// ============================================================================

/// An entry the Source tree says should exist on the Target.
///
/// Produced by the walker with `version = 1` as a placeholder; the decision
/// engine overwrites the version (and carries the reading position forward)
/// when a matching server entry already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredEntry {
    /// Shared identity/version core
    pub core: EntryCore,
    /// Where this entry came from in the Source tree
    pub source: SourceRef,
    /// Reading position carried forward from the server entry on update
    pub current_page: Option<u64>,
}

impl DesiredEntry {
    /// Builds a desired Collection for a visited Source folder.
    #[must_use]
    pub fn collection(id: DocumentId, parent: DocumentId, name: String, source: SourceId) -> Self {
        Self {
            core: EntryCore {
                id,
                kind: EntryKind::Collection,
                parent,
                name,
                version: Version::INITIAL,
            },
            source: SourceRef { id: source, size: 0 },
            current_page: None,
        }
    }

    /// Builds a desired Document for a visited Source file.
    #[must_use]
    pub fn document(
        id: DocumentId,
        parent: DocumentId,
        name: String,
        source: SourceId,
        size: u64,
    ) -> Self {
        Self {
            core: EntryCore {
                id,
                kind: EntryKind::Document,
                parent,
                name,
                version: Version::INITIAL,
            },
            source: SourceRef { id: source, size },
            current_page: None,
        }
    }

    /// Shorthand for the entry's Target id
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.core.id
    }
}

// ============================================================================
// ServerEntry
// ============================================================================

/// An entry as reported by the Target `list_docs` call.
///
/// `success == false` marks entries the service could not fully materialize
/// this call; they are skipped by the download phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Shared identity/version core
    #[serde(flatten)]
    pub core: EntryCore,
    /// Whether the service reported this entry as readable
    #[serde(rename = "Success", default = "default_success")]
    pub success: bool,
    /// Diagnostic message attached by the service, usually empty
    #[serde(rename = "Message", default)]
    pub message: String,
    /// Last opened page on the device
    #[serde(rename = "CurrentPage", default)]
    pub current_page: u64,
}

fn default_success() -> bool {
    true
}

impl ServerEntry {
    /// Shorthand for the entry's Target id
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.core.id
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> DesiredEntry {
        DesiredEntry::document(
            DocumentId::new(),
            DocumentId::new(),
            name.to_string(),
            SourceId::new("src-1").unwrap(),
            1024,
        )
    }

    #[test]
    fn test_collection_shape() {
        let parent = DocumentId::new();
        let entry = DesiredEntry::collection(
            DocumentId::new(),
            parent,
            "Books".to_string(),
            SourceId::new("folder-1").unwrap(),
        );
        assert_eq!(entry.core.kind, EntryKind::Collection);
        assert_eq!(entry.core.parent, parent);
        assert_eq!(entry.core.version, Version::INITIAL);
        assert_eq!(entry.source.size, 0);
    }

    #[test]
    fn test_matches_format() {
        let formats = vec!["pdf".to_string(), "epub".to_string()];
        assert!(doc("report.pdf").core.matches_format(&formats));
        assert!(doc("novel.epub").core.matches_format(&formats));
        assert!(!doc("notes.txt").core.matches_format(&formats));
    }

    #[test]
    fn test_collection_never_matches_format() {
        let formats = vec!["pdf".to_string()];
        let entry = DesiredEntry::collection(
            DocumentId::new(),
            DocumentId::new(),
            "archive.pdf".to_string(),
            SourceId::new("folder-2").unwrap(),
        );
        assert!(!entry.core.matches_format(&formats));
    }

    #[test]
    fn test_server_entry_wire_names() {
        let entry = ServerEntry {
            core: EntryCore {
                id: "550e8400-e29b-41d4-a716-446655440000".parse().unwrap(),
                kind: EntryKind::Document,
                parent: "660e8400-e29b-41d4-a716-446655440000".parse().unwrap(),
                name: "paper.pdf".to_string(),
                version: Version::new(4),
            },
            success: true,
            message: String::new(),
            current_page: 12,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["ID"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(json["Type"], "DocumentType");
        assert_eq!(json["VissibleName"], "paper.pdf");
        assert_eq!(json["Version"], 4);
        assert_eq!(json["CurrentPage"], 12);
    }

    #[test]
    fn test_server_entry_defaults_on_sparse_json() {
        // list_docs responses omit Success/Message/CurrentPage for folders
        let json = serde_json::json!({
            "ID": "550e8400-e29b-41d4-a716-446655440000",
            "Type": "CollectionType",
            "Parent": "660e8400-e29b-41d4-a716-446655440000",
            "VissibleName": "Books",
            "Version": 1
        });
        let entry: ServerEntry = serde_json::from_value(json).unwrap();
        assert!(entry.success);
        assert!(entry.message.is_empty());
        assert_eq!(entry.current_page, 0);
    }
}
