//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the two identity spaces the synchronizer
//! bridges: the Target service's UUID space and the Source storage
//! service's opaque string ids. Each newtype validates at construction.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// DocumentId - Target-native identity
// ============================================================================

/// Identity of a document or collection in the Target service.
///
/// One `DocumentId` is allocated per Source object for the lifetime of the
/// mapping; the Identity Registry guarantees it is never regenerated, so
/// Target-side history and annotations survive re-sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random DocumentId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DocumentId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid document UUID: {e}")))
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// SourceId - Source-native identity
// ============================================================================

/// Opaque identifier of a file or folder in the Source storage service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Create a new SourceId
    ///
    /// # Errors
    /// Returns error if the id is empty
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidSourceId(
                "Source id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for SourceId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

// ============================================================================
// Version - monotonic entry version
// ============================================================================

/// Monotonically increasing version number of a Target entry.
///
/// The source of truth is whichever side last legitimately wrote the entry;
/// a writer wishing to supersede a server entry must bump past the server's
/// version. Versions never decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    /// Placeholder version assigned to freshly walked entries before the
    /// decision engine reconciles them against the server state.
    pub const INITIAL: Self = Self(1);

    /// Create a Version from a raw counter value
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    /// Get the raw counter value
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the version that supersedes `other` (`other + 1`).
    #[must_use]
    pub const fn bump_past(other: Self) -> Self {
        Self(other.0 + 1)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
