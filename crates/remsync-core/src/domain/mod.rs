//! Domain entities and business logic
//!
//! This module contains the core domain types for remsync:
//! - Newtypes for type-safe identifiers and versions
//! - Entry types describing documents and collections on both sides
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use entry::{DesiredEntry, EntryCore, EntryKind, ServerEntry, SourceRef};
pub use errors::DomainError;
pub use newtypes::{DocumentId, SourceId, Version};
