//! Archive manager: snapshot collection, export, import and restore.
//!
//! # Responsibility
//! - Collect the whole collection into one snapshot document.
//! - Drive the import flow: pick, parse, validate, confirm, restore, notify.
//!
//! # Invariants
//! - The import flow performs zero store writes before validation passes and
//!   the caller's interaction confirms the restore.
//! - Replace and merge both read and write through the same key-value store
//!   the day-to-day stores use, bypassing their in-memory caches; callers
//!   refresh those caches through the reload callback.
//! - Merge never alters or reorders existing entries; new entries append at
//!   the tail in archive order.

use super::{ArchiveError, ArchiveResult};
use crate::clock::{to_iso_millis, Clock};
use crate::config::StoreKeys;
use crate::model::archive::{ArchiveMetadata, ArchiveSnapshot, ARCHIVE_FORMAT_VERSION};
use crate::model::entry::Entry;
use crate::repo::kv_store::KeyValueStore;
use log::{info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix of every exported snapshot filename.
const EXPORT_FILE_PREFIX: &str = "diary-backup-";

/// User-interaction seam for the import flow: file selection and the
/// restore confirmation prompt.
pub trait ImportInteraction {
    /// Asks the user for a snapshot file. `Ok(None)` means the pick was
    /// cancelled, which is a normal outcome rather than an error.
    fn pick_backup_file(&self) -> io::Result<Option<PathBuf>>;

    /// Asks the user to confirm a restore described by `plan`. Returning
    /// `false` cancels the import.
    fn confirm_restore(&self, plan: &RestorePlan) -> bool;
}

/// Optional platform share hook offered an exported snapshot file.
pub trait ShareDelegate {
    fn share(&self, path: &Path) -> Result<(), String>;
}

/// Scope description shown to the user before a restore is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    /// `true` discards all current data first; `false` merges.
    pub replace_existing: bool,
    /// Section count carried by the snapshot.
    pub sections: usize,
    /// Entry count carried by the snapshot.
    pub total_items: usize,
    /// Snapshot creation timestamp, when the metadata carries one.
    pub timestamp: Option<String>,
}

/// Terminal outcome of one import flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// File pick cancelled or confirmation declined.
    Cancelled,
    /// Restore applied and collaborators notified.
    Completed(ImportReport),
}

/// Counts describing a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub sections: usize,
    pub total_items: usize,
    pub replaced: bool,
}

/// Counts and location of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub file_name: String,
    pub path: PathBuf,
    pub total_sections: usize,
    pub total_items: usize,
}

/// Live recomputation of collection size, stamped at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOverview {
    pub sections: usize,
    pub total_items: usize,
    pub last_modified: String,
}

/// Bulk export/import engine over the shared key-value store.
pub struct ArchiveManager<'a, S: KeyValueStore> {
    kv: &'a S,
    keys: &'a StoreKeys,
    clock: &'a dyn Clock,
    export_dir: PathBuf,
    app_name: String,
    share: Option<&'a dyn ShareDelegate>,
}

impl<'a, S: KeyValueStore> ArchiveManager<'a, S> {
    pub fn new(
        kv: &'a S,
        keys: &'a StoreKeys,
        clock: &'a dyn Clock,
        export_dir: impl Into<PathBuf>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            kv,
            keys,
            clock,
            export_dir: export_dir.into(),
            app_name: app_name.into(),
            share: None,
        }
    }

    /// Wires a platform share hook offered every exported file.
    pub fn with_share_delegate(mut self, share: &'a dyn ShareDelegate) -> Self {
        self.share = Some(share);
        self
    }

    /// Reads the section list and every section's items into one snapshot.
    ///
    /// One store read per section plus one for the list.
    pub fn collect_all_data(&self) -> ArchiveResult<ArchiveSnapshot> {
        let sections = self.read_current_sections()?;

        let mut items = BTreeMap::new();
        let mut total_items = 0usize;
        for section in &sections {
            let entries = self.read_section_entries(section)?;
            total_items += entries.len();
            items.insert(section.clone(), entries);
        }

        Ok(ArchiveSnapshot {
            metadata: ArchiveMetadata {
                version: ARCHIVE_FORMAT_VERSION.to_string(),
                timestamp: to_iso_millis(self.clock.now()),
                app_name: self.app_name.clone(),
                total_sections: sections.len(),
                total_items,
            },
            sections,
            items,
            total_items,
        })
    }

    /// Collects the whole collection and writes it as one pretty-printed
    /// snapshot file under the export directory.
    ///
    /// The write target is exclusively the new file; a failed write leaves
    /// nothing referenced anywhere. When a share delegate is wired the file
    /// is offered to it; share failure is logged and non-fatal.
    pub fn export_backup(&self) -> ArchiveResult<ExportReport> {
        let snapshot = self.collect_all_data()?;
        let text = serde_json::to_string_pretty(&snapshot)?;

        let file_name = format!(
            "{EXPORT_FILE_PREFIX}{}.json",
            snapshot.metadata.timestamp.replace([':', '.'], "-")
        );
        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(&file_name);
        fs::write(&path, text)?;

        if let Some(share) = self.share {
            if let Err(reason) = share.share(&path) {
                warn!(
                    "event=archive_export module=archive status=degraded error_code=share_failed error={reason}"
                );
            }
        }

        info!(
            "event=archive_export module=archive status=ok sections={} items={} file={file_name}",
            snapshot.metadata.total_sections, snapshot.metadata.total_items
        );
        Ok(ExportReport {
            file_name,
            path,
            total_sections: snapshot.metadata.total_sections,
            total_items: snapshot.metadata.total_items,
        })
    }

    /// Drives the full import flow.
    ///
    /// Pick → parse → validate → confirm → restore → notify. Cancelling the
    /// pick or declining the confirmation returns
    /// [`ImportOutcome::Cancelled`]; parse and validation failures return
    /// [`ArchiveError::InvalidSnapshot`] with the store untouched. After a
    /// successful restore the caller-supplied `reload` callback runs so
    /// dependent caches can refresh.
    pub fn import_backup(
        &self,
        replace_existing: bool,
        interaction: &dyn ImportInteraction,
        reload: Option<&dyn Fn()>,
    ) -> ArchiveResult<ImportOutcome> {
        let Some(path) = interaction.pick_backup_file()? else {
            info!("event=archive_import module=archive status=cancelled stage=pick");
            return Ok(ImportOutcome::Cancelled);
        };

        let raw = fs::read_to_string(&path)?;
        let snapshot: Value = serde_json::from_str(&raw).map_err(|err| {
            ArchiveError::InvalidSnapshot(format!("backup file is not valid JSON: {err}"))
        })?;
        if let Err(reason) = validate_snapshot(&snapshot) {
            info!("event=archive_import module=archive status=invalid reason={reason}");
            return Err(ArchiveError::InvalidSnapshot(reason));
        }

        let plan = restore_plan(&snapshot, replace_existing);
        if !interaction.confirm_restore(&plan) {
            info!("event=archive_import module=archive status=cancelled stage=confirm");
            return Ok(ImportOutcome::Cancelled);
        }

        self.restore_data(&snapshot, replace_existing)?;
        if let Some(reload) = reload {
            reload();
        }

        info!(
            "event=archive_import module=archive status=ok mode={} sections={} items={}",
            restore_mode(replace_existing),
            plan.sections,
            plan.total_items
        );
        Ok(ImportOutcome::Completed(ImportReport {
            sections: plan.sections,
            total_items: plan.total_items,
            replaced: replace_existing,
        }))
    }

    /// Applies a validated snapshot to the store.
    ///
    /// Works on the raw document so imported entries land verbatim. The
    /// snapshot must have passed [`validate_snapshot`].
    pub fn restore_data(&self, snapshot: &Value, replace_existing: bool) -> ArchiveResult<()> {
        let incoming_sections = snapshot_sections(snapshot);
        let incoming_items = snapshot_items(snapshot);

        if replace_existing {
            // Drop every current item partition first; backups stay behind
            // as the last recovery point for the replaced data.
            let current = self.read_current_sections()?;
            for section in &current {
                self.kv.remove(&self.keys.items_key(section))?;
            }

            self.kv.set(
                &self.keys.sections_key,
                &serde_json::to_string(&incoming_sections)?,
            )?;
            for section in &incoming_sections {
                if let Some(entries) = incoming_items.get(section) {
                    self.kv
                        .set(&self.keys.items_key(section), &serde_json::to_string(entries)?)?;
                }
            }
        } else {
            let current = self.read_current_sections()?;
            let mut merged = current.clone();
            let mut seen: HashSet<&str> = current.iter().map(String::as_str).collect();
            for section in &incoming_sections {
                if seen.insert(section) {
                    merged.push(section.clone());
                }
            }
            self.kv
                .set(&self.keys.sections_key, &serde_json::to_string(&merged)?)?;

            for (section, entries) in &incoming_items {
                let mut current_entries = self.read_section_entries_raw(section)?;
                let mut existing_ids: HashSet<String> = current_entries
                    .iter()
                    .filter_map(|entry| entry.get("id"))
                    .map(Value::to_string)
                    .collect();

                for entry in entries.iter() {
                    let known = entry
                        .get("id")
                        .is_some_and(|id| !existing_ids.insert(id.to_string()));
                    if !known {
                        current_entries.push(entry.clone());
                    }
                }

                self.kv.set(
                    &self.keys.items_key(section),
                    &serde_json::to_string(&current_entries)?,
                )?;
            }
        }

        info!(
            "event=archive_restore module=archive status=ok mode={}",
            restore_mode(replace_existing)
        );
        Ok(())
    }

    /// Recomputes collection size from the store; always consistent with
    /// current state at the cost of one read per section.
    pub fn backup_overview(&self) -> ArchiveResult<BackupOverview> {
        let snapshot = self.collect_all_data()?;
        Ok(BackupOverview {
            sections: snapshot.metadata.total_sections,
            total_items: snapshot.metadata.total_items,
            last_modified: to_iso_millis(self.clock.now()),
        })
    }

    fn read_current_sections(&self) -> ArchiveResult<Vec<String>> {
        match self.kv.get(&self.keys.sections_key)? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(sections) => Ok(sections),
                Err(err) => {
                    warn!(
                        "event=archive_collect module=archive status=degraded error_code=sections_decode_failed error={err}"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    fn read_section_entries(&self, section: &str) -> ArchiveResult<Vec<Entry>> {
        match self.kv.get(&self.keys.items_key(section))? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str::<Vec<Entry>>(&raw) {
                Ok(entries) => Ok(entries),
                Err(err) => {
                    warn!(
                        "event=archive_collect module=archive status=degraded error_code=items_decode_failed error={err}"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    fn read_section_entries_raw(&self, section: &str) -> ArchiveResult<Vec<Value>> {
        match self.kv.get(&self.keys.items_key(section))? {
            None => Ok(Vec::new()),
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(entries)) => Ok(entries),
                Ok(_) | Err(_) => {
                    warn!(
                        "event=archive_restore module=archive status=degraded error_code=items_decode_failed section_key={}",
                        self.keys.items_key(section)
                    );
                    Ok(Vec::new())
                }
            },
        }
    }
}

/// Structural contract check for an imported snapshot document.
///
/// Requires `metadata`, a `sections` array of strings, and an `items`
/// object; every section's items value, when present, must be an array.
/// Pure function; returns the specific failure reason.
pub fn validate_snapshot(snapshot: &Value) -> Result<(), String> {
    let Some(document) = snapshot.as_object() else {
        return Err("backup data must be a JSON object".to_string());
    };

    match document.get("metadata") {
        None | Some(Value::Null) => return Err("backup data is missing metadata".to_string()),
        Some(_) => {}
    }

    let Some(sections) = document.get("sections").and_then(Value::as_array) else {
        return Err("sections must be an array".to_string());
    };
    let Some(items) = document.get("items").and_then(Value::as_object) else {
        return Err("items must be an object".to_string());
    };

    for section in sections {
        let Some(name) = section.as_str() else {
            return Err("sections must contain only strings".to_string());
        };
        if let Some(section_items) = items.get(name) {
            if !section_items.is_array() {
                return Err(format!("items for section `{name}` must be an array"));
            }
        }
    }

    Ok(())
}

fn restore_plan(snapshot: &Value, replace_existing: bool) -> RestorePlan {
    let sections = snapshot_sections(snapshot);
    let items = snapshot_items(snapshot);
    let total_items = items.values().map(Vec::len).sum();

    RestorePlan {
        replace_existing,
        sections: sections.len(),
        total_items,
        timestamp: snapshot
            .get("metadata")
            .and_then(|metadata| metadata.get("timestamp"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn snapshot_sections(snapshot: &Value) -> Vec<String> {
    snapshot
        .get("sections")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn snapshot_items(snapshot: &Value) -> BTreeMap<String, Vec<Value>> {
    let mut out = BTreeMap::new();
    let Some(items) = snapshot.get("items").and_then(Value::as_object) else {
        return out;
    };
    for (section, entries) in items {
        if let Some(entries) = entries.as_array() {
            out.insert(section.clone(), entries.clone());
        }
    }
    out
}

fn restore_mode(replace_existing: bool) -> &'static str {
    if replace_existing {
        "replace"
    } else {
        "merge"
    }
}

#[cfg(test)]
mod tests {
    use super::validate_snapshot;
    use serde_json::json;

    #[test]
    fn accepts_minimal_well_formed_snapshot() {
        let snapshot = json!({
            "metadata": {"version": "1.0"},
            "sections": ["Notes"],
            "items": {"Notes": []},
        });
        assert!(validate_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn accepts_sections_without_item_arrays() {
        let snapshot = json!({
            "metadata": {},
            "sections": ["Notes", "Work"],
            "items": {},
        });
        assert!(validate_snapshot(&snapshot).is_ok());
    }

    #[test]
    fn rejects_non_object_document() {
        let reason = validate_snapshot(&json!([1, 2, 3])).unwrap_err();
        assert!(reason.contains("JSON object"));
    }

    #[test]
    fn rejects_missing_metadata() {
        let snapshot = json!({"sections": [], "items": {}});
        let reason = validate_snapshot(&snapshot).unwrap_err();
        assert!(reason.contains("metadata"));
    }

    #[test]
    fn rejects_non_array_sections() {
        let snapshot = json!({"metadata": {}, "sections": "Notes", "items": {}});
        let reason = validate_snapshot(&snapshot).unwrap_err();
        assert_eq!(reason, "sections must be an array");
    }

    #[test]
    fn rejects_missing_items() {
        let snapshot = json!({"metadata": {}, "sections": []});
        let reason = validate_snapshot(&snapshot).unwrap_err();
        assert_eq!(reason, "items must be an object");
    }

    #[test]
    fn rejects_non_string_section_name() {
        let snapshot = json!({"metadata": {}, "sections": [7], "items": {}});
        let reason = validate_snapshot(&snapshot).unwrap_err();
        assert!(reason.contains("strings"));
    }

    #[test]
    fn rejects_non_array_section_items() {
        let snapshot = json!({
            "metadata": {},
            "sections": ["Notes"],
            "items": {"Notes": {"id": 1}},
        });
        let reason = validate_snapshot(&snapshot).unwrap_err();
        assert!(reason.contains("Notes"));
    }
}
