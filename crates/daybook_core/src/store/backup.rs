//! Best-effort shadow backup channel.
//!
//! # Responsibility
//! - Mirror every primary write into a timestamped envelope under a derived
//!   backup key.
//! - Maintain the global backup metadata singleton.
//!
//! # Invariants
//! - `create_backup` never returns an error; every failure is logged and
//!   reported as `false` so the accompanying primary write stays unaffected.
//! - `restore_from_backup` never fails; absent or unparseable envelopes
//!   produce `None` with a warn log.

use crate::clock::{to_iso_millis, Clock};
use crate::config::StoreKeys;
use crate::model::backup::{BackupEnvelope, BackupMetadata, BACKUP_ENVELOPE_VERSION};
use crate::repo::kv_store::KeyValueStore;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

/// Shadow-backup writer bound to one store namespace.
pub struct BackupChannel<'a, S: KeyValueStore> {
    kv: &'a S,
    keys: &'a StoreKeys,
    clock: &'a dyn Clock,
}

impl<'a, S: KeyValueStore> BackupChannel<'a, S> {
    pub fn new(kv: &'a S, keys: &'a StoreKeys, clock: &'a dyn Clock) -> Self {
        Self { kv, keys, clock }
    }

    /// Wraps `data` in a backup envelope, writes it under `backup_key`, then
    /// overwrites the global backup metadata.
    ///
    /// Returns `true` only when both writes landed. Returns `false` on any
    /// failure; callers never abort their primary operation because of it.
    pub fn create_backup<T: Serialize>(&self, backup_key: &str, data: &T) -> bool {
        let now = to_iso_millis(self.clock.now());

        let payload = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=backup_write module=store status=error key={backup_key} error_code=encode_failed error={err}"
                );
                return false;
            }
        };

        let envelope = BackupEnvelope {
            data: payload,
            timestamp: now.clone(),
            version: BACKUP_ENVELOPE_VERSION,
        };
        let envelope_text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=backup_write module=store status=error key={backup_key} error_code=encode_failed error={err}"
                );
                return false;
            }
        };

        if let Err(err) = self.kv.set(backup_key, &envelope_text) {
            warn!(
                "event=backup_write module=store status=error key={backup_key} error_code=kv_set_failed error={err}"
            );
            return false;
        }

        let metadata = BackupMetadata {
            last_backup: now,
            backup_key: backup_key.to_string(),
            status: "success".to_string(),
        };
        let metadata_text = match serde_json::to_string(&metadata) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=backup_write module=store status=error key={backup_key} error_code=metadata_encode_failed error={err}"
                );
                return false;
            }
        };
        if let Err(err) = self.kv.set(&self.keys.backup_metadata_key, &metadata_text) {
            warn!(
                "event=backup_write module=store status=error key={backup_key} error_code=metadata_set_failed error={err}"
            );
            return false;
        }

        info!("event=backup_write module=store status=ok key={backup_key}");
        true
    }

    /// Reads and unwraps the envelope at `backup_key`.
    ///
    /// Returns the contained value, or `None` when the key is absent or the
    /// envelope cannot be parsed.
    pub fn restore_from_backup(&self, backup_key: &str) -> Option<Value> {
        let raw = match self.kv.get(backup_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=backup_read module=store status=error key={backup_key} error_code=kv_get_failed error={err}"
                );
                return None;
            }
        };

        match serde_json::from_str::<BackupEnvelope>(&raw) {
            Ok(envelope) => Some(envelope.data),
            Err(err) => {
                warn!(
                    "event=backup_read module=store status=error key={backup_key} error_code=decode_failed error={err}"
                );
                None
            }
        }
    }

    /// Returns the last-known global backup metadata, or `None` when no
    /// backup has been recorded or the record is unreadable.
    pub fn last_backup_info(&self) -> Option<BackupMetadata> {
        let raw = match self.kv.get(&self.keys.backup_metadata_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=backup_read module=store status=error key={} error_code=kv_get_failed error={err}",
                    self.keys.backup_metadata_key
                );
                return None;
            }
        };

        match serde_json::from_str::<BackupMetadata>(&raw) {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(
                    "event=backup_read module=store status=error key={} error_code=decode_failed error={err}",
                    self.keys.backup_metadata_key
                );
                None
            }
        }
    }
}
