//! The reconciliation orchestrator
//!
//! A run is a strict phase sequence: discover the desired tree from the
//! Source, then (mode permitting) download Target-side changes back,
//! delete Target entries gone from the Source, and upload what the
//! decision engine says has changed. Phases never overlap; per-item
//! failures are logged and aggregated, not raised, so an unattended
//! scheduled run always finishes with a report.
//!
//! Recovery from any partial failure is re-running the whole sync: the
//! desired tree is recomputed fresh and version-based decisions skip the
//! work that already landed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use remsync_bundle::BundlePackager;
use remsync_core::config::{
    ConfigError, SourceLocator, SyncOptions, TargetLocator, UPLOAD_BATCH_SIZE,
    VERSION_PROPERTY_KEY,
};
use remsync_core::domain::entry::{DesiredEntry, ServerEntry};
use remsync_core::domain::newtypes::DocumentId;
use remsync_core::ports::kv_store::KvStore;
use remsync_core::ports::source_store::{SourceFolder, SourceStore};
use remsync_core::ports::target_api::{TargetApi, UploadSlot};
use remsync_registry::IdentityRegistry;

use crate::cache::SyncCache;
use crate::decision::{ForceUpdateFn, UpdatePlanner};
use crate::walker::SourceWalker;

// ============================================================================
// SyncReport
// ============================================================================

/// Outcome counts of one synchronizer run.
///
/// `errors` collects per-item and phase-level failures that were absorbed
/// rather than raised; an empty vector means a fully clean run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Entries in the desired tree walked from the Source
    pub desired: usize,
    /// Content bundles successfully PUT to the Target
    pub uploaded: usize,
    /// Target documents whose content was pulled back into the Source
    pub downloaded: usize,
    /// Source files moved to follow a Target-side move
    pub moved: usize,
    /// Target entries deleted because they left the Source tree
    pub deleted: usize,
    /// Absorbed failures, one message per item or phase
    pub errors: Vec<String>,
}

impl SyncReport {
    fn started_now() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            desired: 0,
            uploaded: 0,
            downloaded: 0,
            moved: 0,
            deleted: 0,
            errors: Vec::new(),
        }
    }
}

// ============================================================================
// Synchronizer
// ============================================================================

/// Orchestrates one reconciliation run between a Source root and a Target
/// root collection.
///
/// Construction ([`Synchronizer::connect`]) resolves both roots, pairs the
/// device if needed, and takes the Target listing; all of that fails fast
/// on configuration problems. [`Synchronizer::run`] then never raises.
pub struct Synchronizer {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetApi>,
    registry: IdentityRegistry,
    cache: SyncCache,
    options: SyncOptions,
    source_root: SourceFolder,
    target_root: DocumentId,
    server_entries: Vec<ServerEntry>,
    planner: UpdatePlanner,
    packager: BundlePackager,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("options", &self.options)
            .field("source_root", &self.source_root)
            .field("target_root", &self.target_root)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Resolves roots and session state, returning a ready-to-run
    /// synchronizer.
    ///
    /// Pairs with the Target when no device credentials are persisted yet;
    /// this requires `options.one_time_code` and fails with
    /// [`ConfigError::MissingCredentials`] without one. The Target root
    /// must already exist; a missing name is a hard failure, not an
    /// implicit create.
    pub async fn connect(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetApi>,
        store: Arc<dyn KvStore>,
        options: SyncOptions,
        force: Option<ForceUpdateFn>,
    ) -> anyhow::Result<Self> {
        let source_root = match &options.source_root {
            SourceLocator::ById(id) => source.get_folder(id).await?,
            SourceLocator::ByQuery(query) => source.search_folders(query).await?,
        }
        .ok_or_else(|| {
            ConfigError::SourceRootNotFound(match &options.source_root {
                SourceLocator::ById(id) => id.to_string(),
                SourceLocator::ByQuery(query) => query.clone(),
            })
        })?;
        info!(name = %source_root.name, "Resolved Source root folder");

        let mut registry = IdentityRegistry::load(store).await?;
        if registry.credentials().is_none() {
            let code = options
                .one_time_code
                .as_deref()
                .ok_or(ConfigError::MissingCredentials)?;
            info!("No stored device credentials, pairing with one-time code");
            let credentials = target.pair(code).await.context("Pairing with Target")?;
            registry.set_credentials(credentials);
            registry.flush().await?;
        }

        let server_entries = target.list_docs(None, true).await?;
        info!(count = server_entries.len(), "Listed Target documents");

        let target_root = match &options.target_root {
            TargetLocator::ById(id) => *id,
            TargetLocator::ByName(name) => server_entries
                .iter()
                .find(|entry| entry.core.name == *name)
                .map(ServerEntry::id)
                .ok_or_else(|| ConfigError::TargetRootNotFound(name.clone()))?,
        };
        info!(id = %target_root, "Resolved Target root collection");

        let cache = SyncCache::load(source.clone(), source_root.id.clone()).await?;

        let planner = UpdatePlanner::new(
            &server_entries,
            options.formats.clone(),
            force.unwrap_or_else(|| Arc::new(|_, _| false)),
        );
        let packager = BundlePackager::new(source.clone());

        Ok(Self {
            source,
            target,
            registry,
            cache,
            options,
            source_root,
            target_root,
            server_entries,
            planner,
            packager,
        })
    }

    /// Runs all configured phases, absorbing failures into the report.
    ///
    /// The outermost boundary for unexpected errors: a scheduled,
    /// unattended run must never crash the process, so whatever escapes
    /// the phases is logged and recorded instead of re-raised.
    pub async fn run(&mut self) -> SyncReport {
        let mut report = SyncReport::started_now();

        if let Err(err) = self.run_phases(&mut report).await {
            error!(error = %format!("{err:#}"), "Run ended early");
            report.errors.push(format!("run aborted: {err:#}"));
        }

        report.finished_at = Utc::now();
        info!(
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            desired = report.desired,
            uploaded = report.uploaded,
            downloaded = report.downloaded,
            moved = report.moved,
            deleted = report.deleted,
            errors = report.errors.len(),
            "Sync finished"
        );
        report
    }

    async fn run_phases(&mut self, report: &mut SyncReport) -> anyhow::Result<()> {
        // Discover
        info!(root = %self.source_root.name, mode = %self.options.mode, "Scanning Source tree");
        let walker = SourceWalker::new(self.source.clone(), self.options.skip_folders.clone());
        let mut desired = walker
            .walk(
                &mut self.registry,
                self.source_root.clone(),
                self.target_root,
            )
            .await?;
        report.desired = desired.len();
        info!(count = desired.len(), "Desired entries in Source tree");

        let descendants = self.descendant_ids();

        // Download
        let mut moved: HashSet<DocumentId> = HashSet::new();
        if self.options.mode.downloads() {
            info!("Downloading updates from Target");
            let candidates: Vec<ServerEntry> = if self.options.mode.downloads_everything() {
                self.server_entries.clone()
            } else {
                self.server_entries
                    .iter()
                    .filter(|entry| descendants.contains(&entry.id()))
                    .cloned()
                    .collect()
            };

            // phase boundary: a failed download pass degrades to "no
            // downloads applied this run" and leaves the cache untouched
            match self.download_updates(&candidates, report).await {
                Ok(moved_ids) => {
                    moved = moved_ids;
                    if let Err(err) = self.cache.save(&candidates).await {
                        warn!(error = %format!("{err:#}"), "Failed to persist sync cache");
                        report.errors.push(format!("cache save: {err:#}"));
                    }
                }
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "Download phase failed");
                    report.errors.push(format!("download phase: {err:#}"));
                }
            }
        }

        // Delete
        if self.options.mode.deletes() {
            let desired_ids: HashSet<DocumentId> = desired.iter().map(DesiredEntry::id).collect();
            let delete_list: Vec<ServerEntry> = self
                .server_entries
                .iter()
                .filter(|entry| {
                    descendants.contains(&entry.id())
                        && !desired_ids.contains(&entry.id())
                        && entry.core.matches_format(&self.options.formats)
                })
                .cloned()
                .collect();

            if !delete_list.is_empty() {
                for entry in &delete_list {
                    debug!(name = %entry.core.name, "Marked for deletion");
                }
                info!(
                    count = delete_list.len(),
                    "Deleting Target entries gone from the Source"
                );
                self.target.delete(&delete_list).await?;
                report.deleted = delete_list.len();
            }
        }

        // Upload
        let planner = &self.planner;
        desired.retain_mut(|entry| {
            // entries moved on the Target this run are not re-uploaded
            !moved.contains(&entry.id()) && planner.needs_update(entry)
        });
        info!(count = desired.len(), "Updating documents and folders");

        let mut committed: Vec<ServerEntry> = Vec::new();
        for batch in desired.chunks(UPLOAD_BATCH_SIZE) {
            committed.extend(self.process_batch(batch, &descendants, report).await?);
        }

        // entries this run pushed count as observed, so a following
        // two-way run doesn't pull them straight back
        if !committed.is_empty() {
            if let Err(err) = self.cache.merge_and_save(&committed).await {
                warn!(error = %format!("{err:#}"), "Failed to fold uploads into sync cache");
                report.errors.push(format!("cache save: {err:#}"));
            }
        }

        Ok(())
    }

    /// All ids reachable from the Target root, the root itself excluded.
    ///
    /// Walked over the parent links of the server listing; the visited set
    /// doubles as cycle protection against inconsistent Target data.
    fn descendant_ids(&self) -> HashSet<DocumentId> {
        let mut children: HashMap<DocumentId, Vec<DocumentId>> = HashMap::new();
        for entry in &self.server_entries {
            children.entry(entry.core.parent).or_default().push(entry.id());
        }

        let mut collected = HashSet::new();
        let mut stack = vec![self.target_root];
        while let Some(id) = stack.pop() {
            if let Some(kids) = children.get(&id) {
                for kid in kids {
                    if collected.insert(*kid) {
                        stack.push(*kid);
                    }
                }
            }
        }
        collected
    }

    // ------------------------------------------------------------------------
    // Download phase
    // ------------------------------------------------------------------------

    /// Pulls newer Target documents back into the Source tree.
    ///
    /// A candidate is applied when it is a readable document that is
    /// uncached or reported with a version above the cached one. The blob
    /// is written under the entry's previous parent (update-in-place when
    /// a same-name file exists there) and then moved to the current one;
    /// a mapped Source file follows a Target-side parent change, and those
    /// ids are returned so the upload phase leaves them alone. The applied
    /// version is annotated on the Source file for inspection.
    async fn download_updates(
        &self,
        candidates: &[ServerEntry],
        report: &mut SyncReport,
    ) -> anyhow::Result<HashSet<DocumentId>> {
        let mut moved = HashSet::new();

        for doc in candidates {
            if !doc.success || !doc.core.kind.is_document() {
                continue;
            }
            let cached = self.cache.get(&doc.id()).cloned();
            let fresh = match &cached {
                Some(known) => doc.core.version > known.core.version,
                None => true,
            };
            if !fresh {
                continue;
            }

            info!(
                name = %doc.core.name,
                version = %doc.core.version,
                "Downloading content update"
            );

            // a Target collection with no Source counterpart yet lands in
            // the Source root
            let new_parent = self
                .registry
                .source_for(&doc.core.parent)
                .cloned()
                .unwrap_or_else(|| self.source_root.id.clone());
            let old_parent = cached
                .as_ref()
                .and_then(|known| self.registry.source_for(&known.core.parent))
                .cloned()
                .unwrap_or_else(|| new_parent.clone());

            let blob = self
                .target
                .download_blob(doc)
                .await
                .with_context(|| format!("Downloading blob for {}", doc.core.name))?;

            let bin_file = match self
                .source
                .find_file_by_name(&old_parent, &doc.core.name)
                .await?
            {
                Some(existing) => {
                    self.source.update_file(&existing.id, &blob).await?;
                    existing
                }
                None => {
                    self.source
                        .create_file(&old_parent, &doc.core.name, &blob)
                        .await?
                }
            };
            self.source.move_file(&bin_file.id, &new_parent).await?;

            // a previously mapped Source file follows the Target-side move
            if old_parent != new_parent {
                if let Some(mapped) = self.registry.source_for(&doc.id()).cloned() {
                    debug!(name = %doc.core.name, "Moving Source file between folders");
                    if mapped != bin_file.id {
                        self.source.move_file(&mapped, &new_parent).await?;
                    }
                    moved.insert(doc.id());
                    report.moved += 1;
                }
            }

            self.source
                .set_property(
                    &bin_file.id,
                    VERSION_PROPERTY_KEY,
                    &doc.core.version.get().to_string(),
                )
                .await?;
            report.downloaded += 1;
        }

        Ok(moved)
    }

    // ------------------------------------------------------------------------
    // Upload phase
    // ------------------------------------------------------------------------

    /// Pushes one batch through the three-step upload handshake.
    ///
    /// Content is PUT for each successfully registered slot whose entry is
    /// new to the device (or force-pushed). A failed PUT queues the entry
    /// for deletion so a metadata stub with no content never survives; the
    /// queue is drained only after the status confirmation, keeping the
    /// server's version bookkeeping consistent.
    ///
    /// Returns the entries the Target confirmed, in server shape, for the
    /// caller to fold into the sync cache.
    async fn process_batch(
        &self,
        batch: &[DesiredEntry],
        descendants: &HashSet<DocumentId>,
        report: &mut SyncReport,
    ) -> anyhow::Result<Vec<ServerEntry>> {
        debug!(size = batch.len(), "Processing upload batch");
        let slots = self.target.upload_request(batch).await?;
        let by_id: HashMap<DocumentId, &DesiredEntry> =
            batch.iter().map(|entry| (entry.id(), entry)).collect();

        let mut failed: Vec<&DesiredEntry> = Vec::new();
        for slot in &slots {
            if !slot.success {
                debug!(id = %slot.id, message = %slot.message, "Registration rejected");
                continue;
            }
            let Some(entry) = by_id.get(&slot.id).copied() else {
                warn!(id = %slot.id, "Registration response for an id not in the batch");
                continue;
            };

            let already_on_device = descendants.contains(&slot.id);
            if already_on_device && !self.planner.force_fires(entry) {
                // metadata-only update; status confirmation below finalizes it
                continue;
            }

            match self.push_bundle(entry, slot).await {
                Ok(()) => report.uploaded += 1,
                Err(err) => {
                    warn!(
                        name = %entry.core.name,
                        error = %format!("{err:#}"),
                        "Upload failed, queueing entry for deletion"
                    );
                    report.errors.push(format!("upload {}: {err:#}", entry.core.name));
                    failed.push(entry);
                }
            }
        }

        debug!("Confirming upload status for batch");
        let receipts = self.target.upload_update_status(batch).await?;
        for receipt in receipts.iter().filter(|receipt| !receipt.success) {
            let name = by_id
                .get(&receipt.id)
                .map_or("<unknown>", |entry| entry.core.name.as_str());
            warn!(%name, message = %receipt.message, "Status confirmation failed");
            report
                .errors
                .push(format!("status {name}: {}", receipt.message));
        }

        let failed_ids: HashSet<DocumentId> = failed.iter().map(|entry| entry.id()).collect();
        if !failed.is_empty() {
            let stubs: Vec<ServerEntry> = failed.iter().map(|entry| stub_entry(entry)).collect();
            info!(count = stubs.len(), "Deleting entries whose content upload failed");
            self.target.delete(&stubs).await?;
        }

        Ok(receipts
            .iter()
            .filter(|receipt| receipt.success && !failed_ids.contains(&receipt.id))
            .filter_map(|receipt| by_id.get(&receipt.id))
            .map(|entry| confirmed_entry(entry))
            .collect())
    }

    async fn push_bundle(&self, entry: &DesiredEntry, slot: &UploadSlot) -> anyhow::Result<()> {
        let url = slot
            .blob_put_url
            .as_deref()
            .context("Registration returned no content PUT URL")?;

        debug!(name = %entry.core.name, bytes = entry.source.size, "Building content bundle");
        let bundle = self.packager.package(entry).await?;
        self.target.put_blob(url, &bundle).await?;
        info!(name = %entry.core.name, version = %entry.core.version, "Uploaded");
        Ok(())
    }
}

/// Server-shaped echo of a desired entry, for deleting a half-registered
/// upload.
fn stub_entry(entry: &DesiredEntry) -> ServerEntry {
    ServerEntry {
        core: entry.core.clone(),
        success: false,
        message: String::new(),
        current_page: 0,
    }
}

/// Server-shaped view of a desired entry the Target confirmed.
fn confirmed_entry(entry: &DesiredEntry) -> ServerEntry {
    ServerEntry {
        core: entry.core.clone(),
        success: true,
        message: String::new(),
        current_page: entry.current_page.unwrap_or(0),
    }
}
