//! JSON-file-backed key/value store
//!
//! Default [`KvStore`] implementation for local runs: the whole table is
//! one JSON object on disk, read fully at load and replaced fully on
//! store, matching the port's batched contract.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;

use remsync_core::ports::kv_store::KvStore;

/// Key/value store persisted as a single JSON object file.
///
/// A missing file reads as an empty table, so first runs need no setup.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl KvStore for JsonFileStore {
    async fn load_all(&self) -> anyhow::Result<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .with_context(|| format!("Parsing store file {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err)
                .with_context(|| format!("Reading store file {}", self.path.display())),
        }
    }

    async fn store_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;

        // write-then-rename so a crash mid-write leaves the old table
        let staged = self.path.with_extension("new");
        tokio::fs::write(&staged, &data)
            .await
            .with_context(|| format!("Writing store file {}", staged.display()))?;
        tokio::fs::rename(&staged, &self.path).await?;
        Ok(())
    }
}
