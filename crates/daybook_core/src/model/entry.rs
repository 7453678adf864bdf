//! Journal entry domain model.
//!
//! # Responsibility
//! - Define the canonical entry record stored inside a section.
//! - Provide lifecycle helpers for edit semantics.
//!
//! # Invariants
//! - `id` is the creation timestamp in epoch milliseconds, unique within its
//!   section at creation time, and never changes afterwards.
//! - `last_modified` refreshes on every edit; `created_at` never does.

use serde::{Deserialize, Serialize};

/// Stable identifier for one entry: creation time in epoch milliseconds.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EntryId = i64;

/// One free-text journal record within a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Creation-timestamp id, assigned once.
    pub id: EntryId,
    /// Free-form entry text.
    pub text: String,
    /// ISO-8601 creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// ISO-8601 timestamp of the latest edit.
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}

impl Entry {
    /// Creates an entry stamped with one timestamp for both lifecycle fields.
    pub fn new(id: EntryId, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        Self {
            id,
            text: text.into(),
            created_at: timestamp.clone(),
            last_modified: timestamp,
        }
    }

    /// Replaces the text and refreshes `last_modified`. The id and
    /// `created_at` stay untouched.
    pub fn edit(&mut self, text: impl Into<String>, timestamp: impl Into<String>) {
        self.text = text.into();
        self.last_modified = timestamp.into();
    }
}

#[cfg(test)]
mod tests {
    use super::Entry;

    #[test]
    fn edit_refreshes_last_modified_only() {
        let mut entry = Entry::new(1700000000000, "draft", "2026-08-06T09:00:00.000Z");
        entry.edit("final", "2026-08-06T10:00:00.000Z");

        assert_eq!(entry.id, 1700000000000);
        assert_eq!(entry.text, "final");
        assert_eq!(entry.created_at, "2026-08-06T09:00:00.000Z");
        assert_eq!(entry.last_modified, "2026-08-06T10:00:00.000Z");
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let entry = Entry::new(42, "hello", "2026-08-06T09:00:00.000Z");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("lastModified").is_some());
        assert!(json.get("created_at").is_none());
    }
}
