//! Persisted snapshot of the Target tree
//!
//! The cache is a JSON array of server entries kept as a side file inside
//! the synchronized Source root. It is the memory between runs that lets
//! the download phase tell a genuinely newer Target entry from one it has
//! already applied, and lets it reconstruct where a moved entry used to
//! live. It is never a truth source for the upload or delete phases.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use remsync_core::config::CACHE_FILE_NAME;
use remsync_core::domain::entry::ServerEntry;
use remsync_core::domain::newtypes::{DocumentId, SourceId};
use remsync_core::ports::source_store::SourceStore;

/// Last-observed Target entries, indexed by id, backed by a side file in
/// the Source root.
pub struct SyncCache {
    source: Arc<dyn SourceStore>,
    root: SourceId,
    file_id: SourceId,
    entries: HashMap<DocumentId, ServerEntry>,
}

/// Indexes a snapshot list by entry id, last write wins on duplicates.
///
/// Duplicate ids should not occur in consistent Target data; tolerating
/// them keeps a half-written snapshot from poisoning the next run.
fn index_entries(list: Vec<ServerEntry>) -> HashMap<DocumentId, ServerEntry> {
    list.into_iter().map(|entry| (entry.id(), entry)).collect()
}

impl SyncCache {
    /// Loads the cache file from `root`, creating an empty one if absent.
    pub async fn load(source: Arc<dyn SourceStore>, root: SourceId) -> anyhow::Result<Self> {
        let file = match source.find_file_by_name(&root, CACHE_FILE_NAME).await? {
            Some(file) => file,
            None => {
                debug!(name = CACHE_FILE_NAME, "Creating empty sync cache file");
                source.create_file(&root, CACHE_FILE_NAME, b"[]").await?
            }
        };

        let raw = source.read_blob(&file.id).await?;
        let list: Vec<ServerEntry> =
            serde_json::from_slice(&raw).context("Parsing sync cache file")?;

        debug!(entries = list.len(), "Sync cache loaded");
        Ok(Self {
            source,
            root,
            file_id: file.id,
            entries: index_entries(list),
        })
    }

    /// The cached entry for `id`, if one was observed last run
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<&ServerEntry> {
        self.entries.get(id)
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the snapshot, on disk and in memory.
    ///
    /// Write-then-swap: the new snapshot lands in a staging file, is
    /// renamed to the cache name, and only then is the previous file
    /// dropped. At every step some file under the cache name holds a
    /// complete snapshot; a failure mid-swap can at worst leave a stale
    /// duplicate behind, never a root with no cache at all.
    pub async fn save(&mut self, list: &[ServerEntry]) -> anyhow::Result<()> {
        let data = serde_json::to_vec(list)?;

        let staged_name = format!("{CACHE_FILE_NAME}.new");
        let staged = self
            .source
            .create_file(&self.root, &staged_name, &data)
            .await
            .context("Staging sync cache file")?;
        self.source.rename_file(&staged.id, CACHE_FILE_NAME).await?;

        let previous = std::mem::replace(&mut self.file_id, staged.id);
        self.entries = index_entries(list.to_vec());
        self.source.delete_file(&previous).await?;

        debug!(entries = self.entries.len(), "Sync cache replaced");
        Ok(())
    }

    /// Folds `list` into the snapshot and persists the result.
    ///
    /// Used after the upload phase so entries this run pushed count as
    /// observed; a following two-way run then doesn't pull back content
    /// the Source is already authoritative for.
    pub async fn merge_and_save(&mut self, list: &[ServerEntry]) -> anyhow::Result<()> {
        let mut merged = self.entries.clone();
        for entry in list {
            merged.insert(entry.id(), entry.clone());
        }
        let snapshot: Vec<ServerEntry> = merged.into_values().collect();
        self.save(&snapshot).await
    }
}
