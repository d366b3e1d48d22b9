//! Per-entry update decision
//!
//! Holds the server-side view of the Target tree and answers, for each
//! desired entry, whether an upload is warranted. A positive answer for an
//! already-registered entry also bumps the desired version past the
//! server's, so the write legitimately supersedes it.
//!
//! Content is deliberately not hashed or size-compared for entries the
//! Target already has: identity plus metadata equality is the sole
//! unchanged-signal, and the force predicate is the one extension point
//! for callers that want a stronger comparison.

use std::collections::HashMap;
use std::sync::Arc;

use remsync_core::config::UPLOAD_SIZE_LIMIT;
use remsync_core::domain::entry::{DesiredEntry, EntryKind, ServerEntry};
use remsync_core::domain::newtypes::{DocumentId, Version};

/// Caller-supplied override deciding whether to re-push an already-synced
/// entry (e.g. "force if checksum differs"). The default never fires.
pub type ForceUpdateFn = Arc<dyn Fn(&DesiredEntry, &ServerEntry) -> bool + Send + Sync>;

/// Decides which desired entries need pushing to the Target.
pub struct UpdatePlanner {
    server: HashMap<DocumentId, ServerEntry>,
    formats: Vec<String>,
    force: ForceUpdateFn,
}

impl UpdatePlanner {
    /// Builds a planner over the server entry list returned by `list_docs`
    #[must_use]
    pub fn new(server_entries: &[ServerEntry], formats: Vec<String>, force: ForceUpdateFn) -> Self {
        Self {
            server: server_entries
                .iter()
                .map(|entry| (entry.id(), entry.clone()))
                .collect(),
            formats,
            force,
        }
    }

    /// The server's view of `id`, if the Target knows it
    #[must_use]
    pub fn server_entry(&self, id: &DocumentId) -> Option<&ServerEntry> {
        self.server.get(id)
    }

    /// Returns true when the force predicate fires for `desired` against
    /// its server entry. Never fires for entries the Target doesn't know.
    #[must_use]
    pub fn force_fires(&self, desired: &DesiredEntry) -> bool {
        self.server
            .get(&desired.id())
            .is_some_and(|server| (self.force)(desired, server))
    }

    /// Decides whether `desired` needs an upload, mutating its version
    /// (and carrying the reading position forward) when a bump is
    /// warranted.
    ///
    /// - Unknown to the Target: a Document qualifies only when it matches
    ///   a syncable format and fits under the upload ceiling; a Collection
    ///   always qualifies.
    /// - Known and the force predicate fires: bump past the server version.
    /// - Known with a differing parent or name (a Source-side move or
    ///   rename): bump past the server version and carry the server's
    ///   reading position forward.
    /// - Otherwise: unchanged.
    pub fn needs_update(&self, desired: &mut DesiredEntry) -> bool {
        let Some(server) = self.server.get(&desired.id()) else {
            return match desired.core.kind {
                EntryKind::Collection => true,
                EntryKind::Document => {
                    desired.core.matches_format(&self.formats)
                        && desired.source.size <= UPLOAD_SIZE_LIMIT
                }
            };
        };

        if (self.force)(desired, server) {
            desired.core.version = Version::bump_past(server.core.version);
            return true;
        }

        if server.core.parent != desired.core.parent || server.core.name != desired.core.name {
            desired.core.version = Version::bump_past(server.core.version);
            desired.current_page = Some(server.current_page);
            return true;
        }

        false
    }
}

// ============================================================================
// Tests
// ============================================================================
