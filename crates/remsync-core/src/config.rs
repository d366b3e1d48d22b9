//! Run configuration for the synchronizer.
//!
//! Provides the sync mode enum, root locators for both services, the
//! `SyncOptions` surface consumed by the orchestrator, and the fixed
//! constants the Target service imposes (upload ceiling, batch size).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::{DocumentId, SourceId};

// ---------------------------------------------------------------------------
// Service constants
// ---------------------------------------------------------------------------

/// Hard ceiling on a single document upload, in bytes (50 MiB).
///
/// The Target service rejects larger payloads; documents over this size are
/// never selected for upload regardless of other conditions.
pub const UPLOAD_SIZE_LIMIT: u64 = 50 * 1024 * 1024;

/// Number of entries registered per upload batch.
///
/// Chosen to respect the Target API's quota and payload constraints; the
/// batches are processed strictly sequentially, not in parallel.
pub const UPLOAD_BATCH_SIZE: usize = 5;

/// Name of the sync cache side file kept inside the Source root folder.
pub const CACHE_FILE_NAME: &str = "SyncCache.json";

/// Source-side property key under which the last-synced version of a
/// downloaded file is annotated.
pub const VERSION_PROPERTY_KEY: &str = "Version";

// ---------------------------------------------------------------------------
// SyncMode
// ---------------------------------------------------------------------------

/// Which reconciliation phases a run performs.
///
/// Terminology borrowed from desktop sync tools: `update` only pushes,
/// `mirror` additionally deletes Target entries gone from the Source, the
/// two-way modes additionally pull Target-side changes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Upload only; no deletes, no downloads
    Update,
    /// Upload + delete; no downloads
    Mirror,
    /// Upload + delete + download, limited to the synchronized subtree
    #[serde(rename = "2way")]
    TwoWay,
    /// Like `2way`, but downloads also back up Target documents living
    /// outside the Source-mirrored subtree into the Source root
    #[serde(rename = "2way-full")]
    TwoWayFull,
}

impl SyncMode {
    /// All accepted mode spellings, for error messages
    pub const ALL: [&'static str; 4] = ["update", "mirror", "2way", "2way-full"];

    /// Returns true when the run includes the download phase
    #[must_use]
    pub fn downloads(&self) -> bool {
        matches!(self, SyncMode::TwoWay | SyncMode::TwoWayFull)
    }

    /// Returns true when the run includes the delete phase
    #[must_use]
    pub fn deletes(&self) -> bool {
        matches!(
            self,
            SyncMode::Mirror | SyncMode::TwoWay | SyncMode::TwoWayFull
        )
    }

    /// Returns true when downloads pull the entire Target document list,
    /// not just descendants of the configured root
    #[must_use]
    pub fn downloads_everything(&self) -> bool {
        matches!(self, SyncMode::TwoWayFull)
    }
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncMode::Update => "update",
            SyncMode::Mirror => "mirror",
            SyncMode::TwoWay => "2way",
            SyncMode::TwoWayFull => "2way-full",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(SyncMode::Update),
            "mirror" => Ok(SyncMode::Mirror),
            "2way" => Ok(SyncMode::TwoWay),
            "2way-full" => Ok(SyncMode::TwoWayFull),
            other => Err(ConfigError::UnsupportedMode(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Root locators
// ---------------------------------------------------------------------------

/// How to find the Source root folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Look the folder up directly by its native id
    ById(SourceId),
    /// Search for it with a Source-service query string
    ByQuery(String),
}

/// How to find the Target root collection.
///
/// The collection must already exist; a missing name is a fatal
/// configuration error rather than an implicit create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLocator {
    /// Use the collection's UUID directly
    ById(DocumentId),
    /// Find the collection by display name in the document list
    ByName(String),
}

impl TargetLocator {
    /// Parses a user-supplied root string: a UUID-shaped value is used as an
    /// id, anything else is treated as a display name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.parse::<DocumentId>() {
            Ok(id) => TargetLocator::ById(id),
            Err(_) => TargetLocator::ByName(s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncOptions
// ---------------------------------------------------------------------------

/// The public configuration surface of a synchronizer run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Where the Source tree is rooted
    pub source_root: SourceLocator,
    /// Where the Target tree is rooted (must already exist)
    pub target_root: TargetLocator,
    /// Which phases to run
    pub mode: SyncMode,
    /// Folder names excluded from the walk (exact match, subtree pruned)
    pub skip_folders: Vec<String>,
    /// File-extension formats eligible for synchronization
    pub formats: Vec<String>,
    /// One-time pairing code, required only when no device credentials
    /// are persisted yet
    pub one_time_code: Option<String>,
}

impl SyncOptions {
    /// Creates options with the default mode (`update`), no skip list, and
    /// the default single `pdf` format.
    #[must_use]
    pub fn new(source_root: SourceLocator, target_root: TargetLocator) -> Self {
        Self {
            source_root,
            target_root,
            mode: SyncMode::Update,
            skip_folders: Vec::new(),
            formats: vec!["pdf".to_string()],
            one_time_code: None,
        }
    }

    /// Sets the sync mode
    #[must_use]
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the folder-name skip list
    #[must_use]
    pub fn with_skip_folders(mut self, skip: Vec<String>) -> Self {
        self.skip_folders = skip;
        self
    }

    /// Sets the syncable formats
    #[must_use]
    pub fn with_formats(mut self, formats: Vec<String>) -> Self {
        self.formats = formats;
        self
    }

    /// Sets the one-time pairing code
    #[must_use]
    pub fn with_one_time_code(mut self, code: impl Into<String>) -> Self {
        self.one_time_code = Some(code.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Fatal configuration errors, raised at construction before any run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown sync mode string
    #[error("syncMode '{0}' not supported, try one of: update, mirror, 2way, 2way-full")]
    UnsupportedMode(String),

    /// The Source root folder could not be found by id or by search
    #[error("Could not find Source folder using locator: {0}")]
    SourceRootNotFound(String),

    /// The Target root collection name does not exist.
    ///
    /// Deliberately a hard failure: construction stays side-effect free and
    /// callers that want auto-creation can create the collection first.
    #[error("Cannot find Target root collection '{0}'")]
    TargetRootNotFound(String),

    /// No stored device credentials and no one-time pairing code supplied
    #[error("No device credentials stored and no one-time pairing code provided")]
    MissingCredentials,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
