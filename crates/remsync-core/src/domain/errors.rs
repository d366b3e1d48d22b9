//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid document UUID
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid Source-native identifier
    #[error("Invalid source id: {0}")]
    InvalidSourceId(String),
}
