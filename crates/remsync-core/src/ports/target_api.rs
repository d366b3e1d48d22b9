//! Target document API port (driven/secondary port)
//!
//! Interface for the proprietary cloud document service with its flat,
//! versioned, UUID-identified storage model. Uploads are a three-step
//! handshake: register metadata for a batch, PUT each content bundle to
//! the returned URL, then confirm status for the batch.
//!
//! ## Design Notes
//!
//! - `Vec<ServerEntry>` from [`TargetApi::list_docs`] is the only view of
//!   the remote tree; there is no partial/paged listing.
//! - No call is retried here; the reconciliation model recovers by
//!   re-running the whole sync, which is idempotent by design.

use serde::{Deserialize, Serialize};

use crate::domain::entry::{DesiredEntry, ServerEntry};
use crate::domain::newtypes::DocumentId;

// ============================================================================
// DeviceCredentials
// ============================================================================

/// Device identity minted by the pairing handshake.
///
/// Persisted between runs (through the Identity Registry's credential
/// storage) so pairing happens once per device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCredentials {
    /// Stable device identifier
    pub device_id: String,
    /// Bearer token minted for the device
    pub device_token: String,
}

// ============================================================================
// Upload handshake DTOs
// ============================================================================

/// Per-item outcome of a batch metadata-registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSlot {
    /// Id of the registered entry
    #[serde(rename = "ID")]
    pub id: DocumentId,
    /// Whether the service accepted the registration
    #[serde(rename = "Success")]
    pub success: bool,
    /// Where to PUT the content bundle; absent when registration failed
    #[serde(rename = "BlobURLPut")]
    pub blob_put_url: Option<String>,
    /// Diagnostic message, usually empty
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Per-item outcome of a batch status-confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReceipt {
    /// Id of the confirmed entry
    #[serde(rename = "ID")]
    pub id: DocumentId,
    /// Whether the confirmation succeeded
    #[serde(rename = "Success")]
    pub success: bool,
    /// Diagnostic message, usually empty
    #[serde(rename = "Message", default)]
    pub message: String,
}

// ============================================================================
// TargetApi trait
// ============================================================================

/// Port trait for Target document service operations
#[async_trait::async_trait]
pub trait TargetApi: Send + Sync {
    /// Exchanges a one-time pairing code for device credentials
    async fn pair(&self, one_time_code: &str) -> anyhow::Result<DeviceCredentials>;

    /// Lists documents, optionally filtered to a single id.
    ///
    /// `with_blob` asks the service to include blob access information so a
    /// later [`TargetApi::download_blob`] works on the returned entries.
    async fn list_docs(
        &self,
        filter: Option<&DocumentId>,
        with_blob: bool,
    ) -> anyhow::Result<Vec<ServerEntry>>;

    /// Registers a batch of entries for upload, returning per-item slots
    /// with the content PUT URLs
    async fn upload_request(&self, batch: &[DesiredEntry]) -> anyhow::Result<Vec<UploadSlot>>;

    /// PUTs a content bundle to the URL returned by
    /// [`TargetApi::upload_request`]
    async fn put_blob(&self, url: &str, bundle: &[u8]) -> anyhow::Result<()>;

    /// Confirms a batch's upload status, finalizing server-side version
    /// bookkeeping
    async fn upload_update_status(
        &self,
        batch: &[DesiredEntry],
    ) -> anyhow::Result<Vec<StatusReceipt>>;

    /// Downloads a document's binary content
    async fn download_blob(&self, entry: &ServerEntry) -> anyhow::Result<Vec<u8>>;

    /// Deletes the given entries from the service
    async fn delete(&self, entries: &[ServerEntry]) -> anyhow::Result<()>;
}
