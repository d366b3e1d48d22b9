//! Recursive Source tree enumeration
//!
//! Flattens the Source tree rooted at a folder into the desired entry
//! list, resolving every visited object's UUID through the Identity
//! Registry on the way. Skip-listed folders are pruned before recursion,
//! so their descendants are never visited and never allocate UUIDs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use remsync_core::config::CACHE_FILE_NAME;
use remsync_core::domain::entry::DesiredEntry;
use remsync_core::domain::newtypes::DocumentId;
use remsync_core::ports::source_store::{SourceFolder, SourceStore};
use remsync_registry::IdentityRegistry;

/// Walks the Source tree into a flat desired entry list.
pub struct SourceWalker {
    source: Arc<dyn SourceStore>,
    skip_folders: Vec<String>,
}

impl SourceWalker {
    /// Creates a walker with the given folder-name skip list (exact match)
    #[must_use]
    pub fn new(source: Arc<dyn SourceStore>, skip_folders: Vec<String>) -> Self {
        Self {
            source,
            skip_folders,
        }
    }

    /// Walks the tree rooted at `root`, emitting `root` itself as a
    /// Collection under `target_parent`.
    ///
    /// Emission order per folder: the folder entry, then its direct files,
    /// then each subfolder's subtree. Walking allocates registry mappings
    /// as a side effect even when no upload follows; the registry is
    /// flushed once at the end of the walk.
    pub async fn walk(
        &self,
        registry: &mut IdentityRegistry,
        root: SourceFolder,
        target_parent: DocumentId,
    ) -> anyhow::Result<Vec<DesiredEntry>> {
        let entries = self.visit(registry, root, target_parent).await?;
        registry.flush().await?;
        Ok(entries)
    }

    /// Recursive step, returning the subtree's entries by value.
    fn visit<'a>(
        &'a self,
        registry: &'a mut IdentityRegistry,
        folder: SourceFolder,
        parent: DocumentId,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<DesiredEntry>>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = Vec::new();

            if self.skip_folders.iter().any(|skip| skip == &folder.name) {
                debug!(name = %folder.name, "Skipping Source sub folder");
                return Ok(entries);
            }
            debug!(name = %folder.name, "Scanning Source sub folder");

            let folder_uuid = registry.resolve(&folder.id);
            entries.push(DesiredEntry::collection(
                folder_uuid,
                parent,
                folder.name.clone(),
                folder.id.clone(),
            ));

            for file in self.source.list_files(&folder.id).await? {
                if file.name == CACHE_FILE_NAME {
                    // the sync cache side file lives in the root but is
                    // not content
                    continue;
                }
                let uuid = registry.resolve(&file.id);
                entries.push(DesiredEntry::document(
                    uuid,
                    folder_uuid,
                    file.name.clone(),
                    file.id.clone(),
                    file.size,
                ));
            }

            for sub in self.source.list_folders(&folder.id).await? {
                entries.extend(self.visit(&mut *registry, sub, folder_uuid).await?);
            }

            Ok(entries)
        })
    }
}
