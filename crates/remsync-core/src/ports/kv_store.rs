//! Persistent key/value store port (driven/secondary port)
//!
//! Process-wide, string-keyed persistence used for the Identity Registry
//! mapping table and the two reserved device-credential keys. The store is
//! read fully at the start of a run and written fully on flush; per-key
//! round-trips are deliberately not part of the contract so writes can be
//! batched against quota-limited backends.

use std::collections::HashMap;

/// Port trait for the persistent key/value store
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the entire store
    async fn load_all(&self) -> anyhow::Result<HashMap<String, String>>;

    /// Replaces the entire store contents in one batched write
    async fn store_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()>;
}
