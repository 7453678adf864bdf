//! Shadow-backup wire models.
//!
//! # Responsibility
//! - Define the envelope written next to every primary value.
//! - Define the global backup metadata singleton.
//!
//! # Invariants
//! - The envelope payload is opaque to the backup channel; it is whatever the
//!   primary write persisted, wrapped without alteration.
//! - Metadata is overwritten by the most recent backup system-wide; it is not
//!   a per-key history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope format version written into every backup.
pub const BACKUP_ENVELOPE_VERSION: u32 = 1;

/// Timestamped wrapper persisted under a derived backup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEnvelope {
    /// The backed-up value, verbatim.
    pub data: Value,
    /// ISO-8601 write timestamp.
    pub timestamp: String,
    /// Envelope format version.
    pub version: u32,
}

/// Global record describing the most recent backup operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// ISO-8601 timestamp of the last backup write.
    #[serde(rename = "lastBackup")]
    pub last_backup: String,
    /// Backup key the last write landed under.
    #[serde(rename = "backupKey")]
    pub backup_key: String,
    /// Outcome marker; only successful writes update this record.
    pub status: String,
}
