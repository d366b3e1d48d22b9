//! remsync Bundle - Target upload bundle packaging
//!
//! The Target service takes content as a zip archive whose member base
//! names are the entry's UUID. This crate builds those archives from
//! Source file content: a bare placeholder archive for collections, and
//! a blob + sidecar archive for documents.

pub mod content;
pub mod packager;

pub use content::ContentMetadata;
pub use packager::BundlePackager;
