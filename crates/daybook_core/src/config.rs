//! Persisted key namespace configuration.
//!
//! # Responsibility
//! - Own every string key the store reads or writes.
//! - Derive per-section and per-backup keys from one injected value object.
//!
//! # Invariants
//! - A backup key is the primary key with its leading `@` stripped and the
//!   backup prefix applied, so `@diary_sections` mirrors to
//!   `@backup_diary_sections`.
//! - Two `StoreKeys` values with different prefixes never collide, which is
//!   what lets tests share one connection across isolated namespaces.

/// Key namespace injected into stores, backup channel and archive manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// Key holding the JSON array of section names.
    pub sections_key: String,
    /// Prefix for per-section item keys; the section name is appended.
    pub items_prefix: String,
    /// Prefix applied to a primary key (minus its leading `@`) to derive the
    /// shadow-backup key.
    pub backup_prefix: String,
    /// Key holding the global backup metadata singleton.
    pub backup_metadata_key: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            sections_key: "@diary_sections".to_string(),
            items_prefix: "@diary_items_".to_string(),
            backup_prefix: "@backup_".to_string(),
            backup_metadata_key: "@backup_metadata".to_string(),
        }
    }
}

impl StoreKeys {
    /// Returns the items key for one section, e.g. `@diary_items_Notes`.
    pub fn items_key(&self, section: &str) -> String {
        format!("{}{section}", self.items_prefix)
    }

    /// Derives the shadow-backup key for a primary key.
    pub fn backup_key_for(&self, primary_key: &str) -> String {
        let stripped = primary_key.strip_prefix('@').unwrap_or(primary_key);
        format!("{}{stripped}", self.backup_prefix)
    }

    /// Backup key mirroring the section list.
    pub fn sections_backup_key(&self) -> String {
        self.backup_key_for(&self.sections_key)
    }

    /// Backup key mirroring one section's items.
    pub fn items_backup_key(&self, section: &str) -> String {
        self.backup_key_for(&self.items_key(section))
    }
}
