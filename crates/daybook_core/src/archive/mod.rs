//! Full-collection export, validation and restore.
//!
//! # Responsibility
//! - Export every section and entry into one snapshot file.
//! - Validate and restore imported snapshots with replace or merge
//!   semantics.
//!
//! # Invariants
//! - Validation failures never leave partial writes; the store is untouched
//!   until a snapshot passes validation and the restore is confirmed.
//! - Restore operates on the raw snapshot document: imported entries are
//!   never altered.

use crate::repo::kv_store::KvError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod manager;

pub use manager::{
    validate_snapshot, ArchiveManager, BackupOverview, ExportReport, ImportInteraction,
    ImportOutcome, ImportReport, RestorePlan, ShareDelegate,
};

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive-level error for export and import flows.
#[derive(Debug)]
pub enum ArchiveError {
    /// Store or persistence failure underneath the archive operation.
    Store(StoreError),
    /// Snapshot file read/write failure.
    Io(std::io::Error),
    /// The imported document is not a usable snapshot; carries the specific
    /// reason.
    InvalidSnapshot(String),
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "archive file error: {err}"),
            Self::InvalidSnapshot(reason) => write!(f, "invalid backup data: {reason}"),
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidSnapshot(_) => None,
        }
    }
}

impl From<StoreError> for ArchiveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<KvError> for ArchiveError {
    fn from(value: KvError) -> Self {
        Self::Store(StoreError::Kv(value))
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(value: serde_json::Error) -> Self {
        Self::Store(StoreError::Serde(value))
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
