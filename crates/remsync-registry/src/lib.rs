//! remsync Registry - Persisted identity mapping
//!
//! The [`IdentityRegistry`] owns the bijective mapping between Source-native
//! ids and Target UUIDs, plus the device credentials for the Target API
//! session. Both live in the same backing [`KvStore`], but credentials are
//! held in a separate structure and never leak into the mapping view.
//!
//! ## Lifecycle
//!
//! - Loaded fully from the store at construction.
//! - Mutated in memory while the Source tree is walked; every visited
//!   object resolves its UUID here, allocating on first sight.
//! - Flushed back in one batched write after the walk.
//!
//! Stability is the point: a Source object keeps the same UUID across runs
//! so Target-side history and annotations survive re-sync.

pub mod store;

pub use store::JsonFileStore;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use remsync_core::domain::newtypes::{DocumentId, SourceId};
use remsync_core::ports::kv_store::KvStore;
use remsync_core::ports::target_api::DeviceCredentials;

/// Reserved store key for the Target device token.
///
/// Lives alongside the mapping table in the same store but is excluded
/// from the mapping view.
pub const DEVICE_TOKEN_KEY: &str = "__TARGET_DEVICE_TOKEN__";

/// Reserved store key for the Target device id.
pub const DEVICE_ID_KEY: &str = "__TARGET_DEVICE_ID__";

/// Bijective SourceId ⇄ DocumentId mapping with batched persistence.
///
/// The forward and reverse maps are owned fields kept consistent by a
/// single mutation entry point ([`IdentityRegistry::resolve`]); nothing
/// else writes to either map.
pub struct IdentityRegistry {
    store: Arc<dyn KvStore>,
    forward: HashMap<SourceId, DocumentId>,
    reverse: HashMap<DocumentId, SourceId>,
    credentials: Option<DeviceCredentials>,
    dirty: bool,
}

impl IdentityRegistry {
    /// Loads the registry from the backing store.
    ///
    /// The two reserved credential keys are split off into the credential
    /// slot; every other key is interpreted as a SourceId → UUID pair.
    /// Entries whose value does not parse as a UUID are dropped with a
    /// warning rather than failing the whole load.
    pub async fn load(store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let mut raw = store.load_all().await?;

        let device_token = raw.remove(DEVICE_TOKEN_KEY);
        let device_id = raw.remove(DEVICE_ID_KEY);
        let credentials = match (device_id, device_token) {
            (Some(device_id), Some(device_token)) => Some(DeviceCredentials {
                device_id,
                device_token,
            }),
            _ => None,
        };

        let mut forward = HashMap::with_capacity(raw.len());
        let mut reverse = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let source = match SourceId::new(key) {
                Ok(s) => s,
                Err(err) => {
                    warn!(%err, "Dropping malformed source id from registry store");
                    continue;
                }
            };
            let id = match value.parse::<DocumentId>() {
                Ok(id) => id,
                Err(err) => {
                    warn!(source = %source, %err, "Dropping malformed UUID from registry store");
                    continue;
                }
            };
            forward.insert(source.clone(), id);
            reverse.insert(id, source);
        }

        debug!(
            mappings = forward.len(),
            has_credentials = credentials.is_some(),
            "Identity registry loaded"
        );

        Ok(Self {
            store,
            forward,
            reverse,
            credentials,
            dirty: false,
        })
    }

    /// Returns the UUID mapped to `source`, allocating a fresh one on
    /// first sight.
    ///
    /// The sole mutation entry point for the mapping: both directions are
    /// inserted together, so the maps stay exact inverses. A given source
    /// id yields the same UUID within and across runs.
    pub fn resolve(&mut self, source: &SourceId) -> DocumentId {
        if let Some(id) = self.forward.get(source) {
            return *id;
        }
        let id = DocumentId::new();
        self.forward.insert(source.clone(), id);
        self.reverse.insert(id, source.clone());
        self.dirty = true;
        id
    }

    /// Read-only forward lookup; never allocates
    #[must_use]
    pub fn document_for(&self, source: &SourceId) -> Option<DocumentId> {
        self.forward.get(source).copied()
    }

    /// Read-only reverse lookup
    #[must_use]
    pub fn source_for(&self, id: &DocumentId) -> Option<&SourceId> {
        self.reverse.get(id)
    }

    /// Number of mappings held
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true when no mappings are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// The stored device credentials, if pairing has happened before
    #[must_use]
    pub fn credentials(&self) -> Option<&DeviceCredentials> {
        self.credentials.as_ref()
    }

    /// Stores freshly minted device credentials
    pub fn set_credentials(&mut self, credentials: DeviceCredentials) {
        self.credentials = Some(credentials);
        self.dirty = true;
    }

    /// Writes mappings and credentials back in one batched call.
    ///
    /// No-op when nothing changed since load/last flush.
    pub async fn flush(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let mut entries: HashMap<String, String> = self
            .forward
            .iter()
            .map(|(source, id)| (source.as_str().to_string(), id.to_string()))
            .collect();

        if let Some(credentials) = &self.credentials {
            entries.insert(DEVICE_ID_KEY.to_string(), credentials.device_id.clone());
            entries.insert(
                DEVICE_TOKEN_KEY.to_string(),
                credentials.device_token.clone(),
            );
        }

        self.store.store_all(&entries).await?;
        self.dirty = false;

        debug!(mappings = self.forward.len(), "Identity registry flushed");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
