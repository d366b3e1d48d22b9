//! Sidecar metadata carried inside document bundles
//!
//! Every document bundle ships a `{uuid}.content` member describing the
//! document to the Target device. The values below are the fixed defaults
//! for a freshly uploaded document; the device takes ownership of them
//! afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `{uuid}.content` sidecar for a document bundle.
///
/// Field names are the Target's camelCase wire vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    /// Always empty on upload
    pub extra_metadata: Map<String, Value>,
    /// Content format, the file-name extension (e.g. `pdf`, `epub`)
    pub file_type: String,
    /// Reading position; 0 for a fresh upload
    pub last_opened_page: u64,
    /// -1 selects the device default
    pub line_height: i64,
    pub margins: u64,
    /// 0 lets the device count pages on first open
    pub page_count: u64,
    pub text_scale: u64,
    /// Always empty on upload
    pub transform: Map<String, Value>,
}

impl ContentMetadata {
    /// Builds the fixed defaults for a fresh upload of the given format.
    #[must_use]
    pub fn for_file_type(file_type: &str) -> Self {
        Self {
            extra_metadata: Map::new(),
            file_type: file_type.to_string(),
            last_opened_page: 0,
            line_height: -1,
            margins: 100,
            page_count: 0,
            text_scale: 1,
            transform: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(ContentMetadata::for_file_type("pdf")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "extraMetadata": {},
                "fileType": "pdf",
                "lastOpenedPage": 0,
                "lineHeight": -1,
                "margins": 100,
                "pageCount": 0,
                "textScale": 1,
                "transform": {}
            })
        );
    }
}
