//! Source storage port (driven/secondary port)
//!
//! Interface for the hierarchical cloud file service that is the
//! authoritative origin of content. The primary implementation targets a
//! Drive-style API, but the trait only assumes folders, files, shortcuts,
//! blob access, and per-file key/value annotations.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification.
//! - Enumeration methods return the full listing for a folder; the service
//!   exposes them as forward-only single-pass iterators and the adapter is
//!   expected to drain them.
//! - Shortcut resolution follows at most one hop; the packager relies on
//!   that to reach the real blob behind an alias.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::SourceId;

// ============================================================================
// DTOs
// ============================================================================

/// A folder in the Source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFolder {
    /// Native Source identifier
    pub id: SourceId,
    /// Folder display name
    pub name: String,
}

/// A file in the Source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Native Source identifier
    pub id: SourceId,
    /// File display name, extension included
    pub name: String,
    /// Id of the containing folder
    pub parent: SourceId,
    /// Byte size as reported by the service
    pub size: u64,
    /// Whether this file is a shortcut/alias to another file
    pub is_shortcut: bool,
}

impl SourceFile {
    /// The file-name extension, if any (text after the last dot).
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

// ============================================================================
// SourceStore trait
// ============================================================================

/// Port trait for Source storage operations
///
/// ## Implementation Notes
///
/// - All calls are blocking from the orchestrator's point of view; the run
///   never overlaps two operations.
/// - `set_property` attaches an adapter-private key/value annotation to a
///   file; the engine uses it to persist the last-synced Target version on
///   downloaded files.
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    /// Looks a folder up directly by its native id
    async fn get_folder(&self, id: &SourceId) -> anyhow::Result<Option<SourceFolder>>;

    /// Searches folders with a service-specific query string, returning the
    /// first match if any
    async fn search_folders(&self, query: &str) -> anyhow::Result<Option<SourceFolder>>;

    /// Lists the direct subfolder children of a folder
    async fn list_folders(&self, folder: &SourceId) -> anyhow::Result<Vec<SourceFolder>>;

    /// Lists the direct file children of a folder
    async fn list_files(&self, folder: &SourceId) -> anyhow::Result<Vec<SourceFile>>;

    /// Fetches a single file's metadata by id
    async fn get_file(&self, id: &SourceId) -> anyhow::Result<SourceFile>;

    /// Finds a file by exact name within a folder
    async fn find_file_by_name(
        &self,
        folder: &SourceId,
        name: &str,
    ) -> anyhow::Result<Option<SourceFile>>;

    /// Reads a file's binary content
    async fn read_blob(&self, id: &SourceId) -> anyhow::Result<Vec<u8>>;

    /// Creates a new file with the given content inside a folder
    async fn create_file(
        &self,
        folder: &SourceId,
        name: &str,
        data: &[u8],
    ) -> anyhow::Result<SourceFile>;

    /// Overwrites an existing file's content in place
    async fn update_file(&self, id: &SourceId, data: &[u8]) -> anyhow::Result<()>;

    /// Moves a file into another folder
    async fn move_file(&self, id: &SourceId, new_parent: &SourceId) -> anyhow::Result<()>;

    /// Renames a file without moving it
    async fn rename_file(&self, id: &SourceId, new_name: &str) -> anyhow::Result<()>;

    /// Deletes a file
    async fn delete_file(&self, id: &SourceId) -> anyhow::Result<()>;

    /// Resolves a shortcut one hop to the file it points at.
    ///
    /// Returns the input unchanged when it is not a shortcut.
    async fn resolve_shortcut(&self, file: &SourceFile) -> anyhow::Result<SourceFile>;

    /// Attaches a key/value annotation to a file
    async fn set_property(&self, id: &SourceId, key: &str, value: &str) -> anyhow::Result<()>;
}
