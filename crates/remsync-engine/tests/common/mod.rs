//! In-memory fakes for the three ports the engine drives
//!
//! Each fake records the calls the engine makes so scenarios can assert
//! on observable behavior (what was uploaded, deleted, moved) instead of
//! internals. All state sits behind mutexes because the port traits take
//! `&self`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use remsync_core::domain::entry::{DesiredEntry, EntryCore, EntryKind, ServerEntry};
use remsync_core::domain::newtypes::{DocumentId, SourceId, Version};
use remsync_core::ports::kv_store::KvStore;
use remsync_core::ports::source_store::{SourceFile, SourceFolder, SourceStore};
use remsync_core::ports::target_api::{DeviceCredentials, StatusReceipt, TargetApi, UploadSlot};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn sid(s: &str) -> SourceId {
    SourceId::new(s).unwrap()
}

/// Builds a server-side collection entry
pub fn collection_entry(id: DocumentId, parent: DocumentId, name: &str, version: u32) -> ServerEntry {
    ServerEntry {
        core: EntryCore {
            id,
            kind: EntryKind::Collection,
            parent,
            name: name.to_string(),
            version: Version::new(version),
        },
        success: true,
        message: String::new(),
        current_page: 0,
    }
}

/// Builds a server-side document entry
pub fn document_entry(id: DocumentId, parent: DocumentId, name: &str, version: u32) -> ServerEntry {
    ServerEntry {
        core: EntryCore {
            id,
            kind: EntryKind::Document,
            parent,
            name: name.to_string(),
            version: Version::new(version),
        },
        success: true,
        message: String::new(),
        current_page: 0,
    }
}

// ============================================================================
// FakeSource
// ============================================================================

struct FolderRec {
    name: String,
    parent: Option<String>,
}

struct FileRec {
    name: String,
    parent: String,
    size: u64,
    data: Vec<u8>,
    properties: HashMap<String, String>,
}

/// In-memory hierarchical file store
#[derive(Default)]
pub struct FakeSource {
    folders: Mutex<HashMap<String, FolderRec>>,
    files: Mutex<HashMap<String, FileRec>>,
    next_id: AtomicU64,
    /// Renames to these target names fail
    pub fail_rename_to: Mutex<HashSet<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        self.folders.lock().unwrap().insert(
            id.to_string(),
            FolderRec {
                name: name.to_string(),
                parent: parent.map(str::to_string),
            },
        );
    }

    pub fn add_file(&self, id: &str, name: &str, parent: &str, data: &[u8]) {
        self.files.lock().unwrap().insert(
            id.to_string(),
            FileRec {
                name: name.to_string(),
                parent: parent.to_string(),
                size: data.len() as u64,
                data: data.to_vec(),
                properties: HashMap::new(),
            },
        );
    }

    /// Adds a file whose reported size differs from its stored bytes, so
    /// oversize behavior is testable without allocating gigabytes
    pub fn add_file_with_size(&self, id: &str, name: &str, parent: &str, size: u64) {
        self.files.lock().unwrap().insert(
            id.to_string(),
            FileRec {
                name: name.to_string(),
                parent: parent.to_string(),
                size,
                data: Vec::new(),
                properties: HashMap::new(),
            },
        );
    }

    pub fn file_data(&self, id: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(id).map(|rec| rec.data.clone())
    }

    pub fn file_parent(&self, id: &str) -> Option<String> {
        self.files.lock().unwrap().get(id).map(|rec| rec.parent.clone())
    }

    pub fn property(&self, id: &str, key: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(id)
            .and_then(|rec| rec.properties.get(key).cloned())
    }
}

#[async_trait::async_trait]
impl SourceStore for FakeSource {
    async fn get_folder(&self, id: &SourceId) -> anyhow::Result<Option<SourceFolder>> {
        Ok(self.folders.lock().unwrap().get(id.as_str()).map(|rec| {
            SourceFolder {
                id: id.clone(),
                name: rec.name.clone(),
            }
        }))
    }

    async fn search_folders(&self, query: &str) -> anyhow::Result<Option<SourceFolder>> {
        // the fake's query language is just the folder name
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .find(|(_, rec)| rec.name == query)
            .map(|(id, rec)| SourceFolder {
                id: sid(id),
                name: rec.name.clone(),
            }))
    }

    async fn list_folders(&self, folder: &SourceId) -> anyhow::Result<Vec<SourceFolder>> {
        let mut found: Vec<SourceFolder> = self
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, rec)| rec.parent.as_deref() == Some(folder.as_str()))
            .map(|(id, rec)| SourceFolder {
                id: sid(id),
                name: rec.name.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn list_files(&self, folder: &SourceId) -> anyhow::Result<Vec<SourceFile>> {
        let mut found: Vec<SourceFile> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, rec)| rec.parent == folder.as_str())
            .map(|(id, rec)| SourceFile {
                id: sid(id),
                name: rec.name.clone(),
                parent: sid(&rec.parent),
                size: rec.size,
                is_shortcut: false,
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn get_file(&self, id: &SourceId) -> anyhow::Result<SourceFile> {
        let files = self.files.lock().unwrap();
        let rec = files
            .get(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))?;
        Ok(SourceFile {
            id: id.clone(),
            name: rec.name.clone(),
            parent: sid(&rec.parent),
            size: rec.size,
            is_shortcut: false,
        })
    }

    async fn find_file_by_name(
        &self,
        folder: &SourceId,
        name: &str,
    ) -> anyhow::Result<Option<SourceFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|(_, rec)| rec.parent == folder.as_str() && rec.name == name)
            .map(|(id, rec)| SourceFile {
                id: sid(id),
                name: rec.name.clone(),
                parent: sid(&rec.parent),
                size: rec.size,
                is_shortcut: false,
            }))
    }

    async fn read_blob(&self, id: &SourceId) -> anyhow::Result<Vec<u8>> {
        self.file_data(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))
    }

    async fn create_file(
        &self,
        folder: &SourceId,
        name: &str,
        data: &[u8],
    ) -> anyhow::Result<SourceFile> {
        let id = format!("created-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.add_file(&id, name, folder.as_str(), data);
        Ok(SourceFile {
            id: sid(&id),
            name: name.to_string(),
            parent: folder.clone(),
            size: data.len() as u64,
            is_shortcut: false,
        })
    }

    async fn update_file(&self, id: &SourceId, data: &[u8]) -> anyhow::Result<()> {
        let mut files = self.files.lock().unwrap();
        let rec = files
            .get_mut(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))?;
        rec.data = data.to_vec();
        rec.size = data.len() as u64;
        Ok(())
    }

    async fn move_file(&self, id: &SourceId, new_parent: &SourceId) -> anyhow::Result<()> {
        let mut files = self.files.lock().unwrap();
        let rec = files
            .get_mut(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))?;
        rec.parent = new_parent.as_str().to_string();
        Ok(())
    }

    async fn rename_file(&self, id: &SourceId, new_name: &str) -> anyhow::Result<()> {
        if self.fail_rename_to.lock().unwrap().contains(new_name) {
            anyhow::bail!("simulated rename failure to {new_name}");
        }
        let mut files = self.files.lock().unwrap();
        let rec = files
            .get_mut(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))?;
        rec.name = new_name.to_string();
        Ok(())
    }

    async fn delete_file(&self, id: &SourceId) -> anyhow::Result<()> {
        self.files.lock().unwrap().remove(id.as_str());
        Ok(())
    }

    async fn resolve_shortcut(&self, file: &SourceFile) -> anyhow::Result<SourceFile> {
        Ok(file.clone())
    }

    async fn set_property(&self, id: &SourceId, key: &str, value: &str) -> anyhow::Result<()> {
        let mut files = self.files.lock().unwrap();
        let rec = files
            .get_mut(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("no such file: {id}"))?;
        rec.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// FakeTarget
// ============================================================================

/// Expected content PUT URL for an entry, mirroring the fake's slots
pub fn put_url(id: DocumentId) -> String {
    format!("https://blob.test/{id}")
}

/// In-memory flat document service
#[derive(Default)]
pub struct FakeTarget {
    /// Current server listing; upload status commits into it
    pub docs: Mutex<Vec<ServerEntry>>,
    /// Downloadable content per entry id
    pub blobs: Mutex<HashMap<DocumentId, Vec<u8>>>,
    /// Every content PUT the engine performed, as (url, bundle bytes)
    pub put_blobs: Mutex<Vec<(String, Vec<u8>)>>,
    /// Registration batches in submission order
    pub batches: Mutex<Vec<Vec<DocumentId>>>,
    /// Ids passed to delete, in order
    pub deleted: Mutex<Vec<DocumentId>>,
    /// Ids whose registration is rejected with `Success=false`
    pub reject_registration: Mutex<HashSet<DocumentId>>,
    /// PUT URLs that fail
    pub fail_put_urls: Mutex<HashSet<String>>,
    /// Number of pairing handshakes performed
    pub paired: Mutex<u32>,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_doc(&self, entry: ServerEntry) {
        self.docs.lock().unwrap().push(entry);
    }

    pub fn doc_named(&self, name: &str) -> Option<ServerEntry> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.core.name == name)
            .cloned()
    }

    pub fn uploaded_ids(&self) -> Vec<DocumentId> {
        self.batches.lock().unwrap().iter().flatten().copied().collect()
    }
}

#[async_trait::async_trait]
impl TargetApi for FakeTarget {
    async fn pair(&self, _one_time_code: &str) -> anyhow::Result<DeviceCredentials> {
        *self.paired.lock().unwrap() += 1;
        Ok(DeviceCredentials {
            device_id: "fake-device".to_string(),
            device_token: "fake-token".to_string(),
        })
    }

    async fn list_docs(
        &self,
        filter: Option<&DocumentId>,
        _with_blob: bool,
    ) -> anyhow::Result<Vec<ServerEntry>> {
        let docs = self.docs.lock().unwrap();
        Ok(match filter {
            Some(id) => docs.iter().filter(|entry| entry.id() == *id).cloned().collect(),
            None => docs.clone(),
        })
    }

    async fn upload_request(&self, batch: &[DesiredEntry]) -> anyhow::Result<Vec<UploadSlot>> {
        self.batches
            .lock()
            .unwrap()
            .push(batch.iter().map(|entry| entry.id()).collect());

        let rejected = self.reject_registration.lock().unwrap();
        Ok(batch
            .iter()
            .map(|entry| {
                let success = !rejected.contains(&entry.id());
                UploadSlot {
                    id: entry.id(),
                    success,
                    blob_put_url: success.then(|| put_url(entry.id())),
                    message: if success {
                        String::new()
                    } else {
                        "registration rejected".to_string()
                    },
                }
            })
            .collect())
    }

    async fn put_blob(&self, url: &str, bundle: &[u8]) -> anyhow::Result<()> {
        if self.fail_put_urls.lock().unwrap().contains(url) {
            anyhow::bail!("simulated PUT failure for {url}");
        }
        self.put_blobs
            .lock()
            .unwrap()
            .push((url.to_string(), bundle.to_vec()));
        Ok(())
    }

    async fn upload_update_status(
        &self,
        batch: &[DesiredEntry],
    ) -> anyhow::Result<Vec<StatusReceipt>> {
        let rejected = self.reject_registration.lock().unwrap().clone();
        let mut docs = self.docs.lock().unwrap();
        let mut receipts = Vec::new();

        for entry in batch {
            let success = !rejected.contains(&entry.id());
            if success {
                let committed = ServerEntry {
                    core: entry.core.clone(),
                    success: true,
                    message: String::new(),
                    current_page: entry.current_page.unwrap_or(0),
                };
                match docs.iter_mut().find(|doc| doc.id() == entry.id()) {
                    Some(existing) => *existing = committed,
                    None => docs.push(committed),
                }
            }
            receipts.push(StatusReceipt {
                id: entry.id(),
                success,
                message: if success {
                    String::new()
                } else {
                    "registration rejected".to_string()
                },
            });
        }
        Ok(receipts)
    }

    async fn download_blob(&self, entry: &ServerEntry) -> anyhow::Result<Vec<u8>> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .get(&entry.id())
            .cloned()
            .unwrap_or_else(|| b"target-content".to_vec()))
    }

    async fn delete(&self, entries: &[ServerEntry]) -> anyhow::Result<()> {
        let mut deleted = self.deleted.lock().unwrap();
        let mut docs = self.docs.lock().unwrap();
        for entry in entries {
            deleted.push(entry.id());
            docs.retain(|doc| doc.id() != entry.id());
        }
        Ok(())
    }
}

// ============================================================================
// MemoryKv
// ============================================================================

/// In-memory key/value store
#[derive(Default)]
pub struct MemoryKv {
    pub entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKv {
    async fn load_all(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn store_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        *self.entries.lock().unwrap() = entries.clone();
        Ok(())
    }
}
