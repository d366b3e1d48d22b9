//! remsync Engine - Tree reconciliation between Source and Target
//!
//! This crate sequences a synchronizer run: walk the Source tree into a
//! desired entry list, decide per entry whether the Target needs an
//! update, then drive the download, delete, and upload phases according
//! to the configured sync mode. All remote access goes through the port
//! traits in `remsync-core`; nothing here knows a concrete service.
//!
//! ## Modules
//!
//! - `walker` - recursive Source tree enumeration
//! - `decision` - per-entry update decision and version bumping
//! - `cache` - persisted snapshot of the Target tree (side file in the
//!   Source root)
//! - `engine` - the [`Synchronizer`] orchestrator itself

pub mod cache;
pub mod decision;
pub mod engine;
pub mod walker;

pub use cache::SyncCache;
pub use decision::{ForceUpdateFn, UpdatePlanner};
pub use engine::{SyncReport, Synchronizer};
pub use walker::SourceWalker;
