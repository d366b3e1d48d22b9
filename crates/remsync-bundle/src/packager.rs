//! Builds the zip archives the Target accepts as content PUTs
//!
//! Archive layout per entry kind:
//!
//! - Collection: a single `{uuid}.content` member holding `{}`.
//! - Document: the raw blob as `{uuid}.{ext}`, an empty `{uuid}.pagedata`,
//!   and a `{uuid}.content` sidecar with the fresh-upload defaults.
//!
//! Member base names are the entry's UUID byte-for-byte; the device keys
//! bundle members by name, so any drift there orphans the content.

use std::io::{Cursor, Write};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use remsync_core::domain::entry::{DesiredEntry, EntryKind};
use remsync_core::domain::newtypes::DocumentId;
use remsync_core::ports::source_store::SourceStore;

use crate::content::ContentMetadata;

// ============================================================================
// BundlePackager
// ============================================================================

/// Packages desired entries into upload bundles, reading document blobs
/// through the Source storage port.
pub struct BundlePackager {
    source: Arc<dyn SourceStore>,
}

impl BundlePackager {
    /// Creates a packager over the given Source store
    #[must_use]
    pub fn new(source: Arc<dyn SourceStore>) -> Self {
        Self { source }
    }

    /// Builds the upload bundle for `entry`.
    ///
    /// Documents are re-fetched by Source id at packaging time and
    /// shortcuts are followed one hop, so the blob comes from the real
    /// file behind an alias. The bundle's format is taken from the
    /// resolved file's extension, not the alias name.
    pub async fn package(&self, entry: &DesiredEntry) -> anyhow::Result<Vec<u8>> {
        match entry.core.kind {
            EntryKind::Collection => collection_bundle(entry.id()),
            EntryKind::Document => {
                let file = self
                    .source
                    .get_file(&entry.source.id)
                    .await
                    .with_context(|| format!("Fetching source file for {}", entry.core.name))?;
                let file = self.source.resolve_shortcut(&file).await?;
                let file_type = file
                    .extension()
                    .map(str::to_string)
                    .with_context(|| format!("Source file {} has no extension", file.name))?;
                let blob = self
                    .source
                    .read_blob(&file.id)
                    .await
                    .with_context(|| format!("Reading source blob for {}", entry.core.name))?;

                debug!(
                    id = %entry.id(),
                    name = %entry.core.name,
                    bytes = blob.len(),
                    %file_type,
                    "Packaged document bundle"
                );
                document_bundle(entry.id(), &file_type, &blob)
            }
        }
    }
}

// ============================================================================
// Archive builders
// ============================================================================

/// Builds a collection bundle: one `{uuid}.content` member holding `{}`.
pub fn collection_bundle(id: DocumentId) -> anyhow::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = member_options();

    writer.start_file(format!("{id}.content"), options)?;
    writer.write_all(b"{}")?;

    Ok(writer.finish()?.into_inner())
}

/// Builds a document bundle from a raw blob and its format.
pub fn document_bundle(id: DocumentId, file_type: &str, blob: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = member_options();

    writer.start_file(format!("{id}.{file_type}"), options)?;
    writer.write_all(blob)?;

    writer.start_file(format!("{id}.pagedata"), options)?;

    writer.start_file(format!("{id}.content"), options)?;
    let sidecar = serde_json::to_vec(&ContentMetadata::for_file_type(file_type))?;
    writer.write_all(&sidecar)?;

    Ok(writer.finish()?.into_inner())
}

fn member_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

// ============================================================================
// Tests
// ============================================================================
