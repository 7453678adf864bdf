//! Archive snapshot wire models.
//!
//! # Responsibility
//! - Define the exported/imported backup file format.
//!
//! # Invariants
//! - `metadata.version` is the single archive format tag (`"1.0"`).
//! - `total_items` equals the sum of all section item counts at collect time
//!   and is duplicated at the top level for quick inspection.

use crate::model::entry::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Archive format version tag.
pub const ARCHIVE_FORMAT_VERSION: &str = "1.0";

/// Header block of an exported snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Archive format version, `"1.0"`.
    pub version: String,
    /// ISO-8601 export timestamp.
    pub timestamp: String,
    /// Exporting application name.
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "totalSections")]
    pub total_sections: usize,
    #[serde(rename = "totalItems")]
    pub total_items: usize,
}

/// Full-collection export: every section and its entries in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
    pub metadata: ArchiveMetadata,
    /// Section names in display order.
    pub sections: Vec<String>,
    /// Entries per section name.
    pub items: BTreeMap<String, Vec<Entry>>,
    #[serde(rename = "totalItems")]
    pub total_items: usize,
}
