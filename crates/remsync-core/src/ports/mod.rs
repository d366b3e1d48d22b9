//! Port definitions (driven/secondary ports)
//!
//! Trait interfaces for the three external collaborators: the Source
//! storage client, the Target document API client, and the process-wide
//! key/value persistence store. Concrete adapters live outside this
//! workspace and are injected as `Arc<dyn Trait>`.

pub mod kv_store;
pub mod source_store;
pub mod target_api;

pub use kv_store::KvStore;
pub use source_store::{SourceFile, SourceFolder, SourceStore};
pub use target_api::{DeviceCredentials, StatusReceipt, TargetApi, UploadSlot};
