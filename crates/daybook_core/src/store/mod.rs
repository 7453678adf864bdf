//! Stateful stores: section list, per-section items, shadow backups.
//!
//! # Responsibility
//! - Orchestrate key-value reads/writes into journal-level operations.
//! - Keep cached in-memory state consistent with persisted state.
//!
//! # Invariants
//! - Every mutation persists first and commits to memory only after the
//!   primary write succeeds (write-then-commit, uniformly).
//! - The shadow backup is a best-effort side channel; its failure never
//!   aborts or rolls back the primary write it accompanies.

use crate::repo::kv_store::KvError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod backup;
pub mod item_store;
pub mod section_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error for section and item operations.
#[derive(Debug)]
pub enum StoreError {
    /// Persistence transport failure.
    Kv(KvError),
    /// Write-side JSON encoding failure.
    Serde(serde_json::Error),
    /// Section name is empty after trimming.
    EmptyName,
    /// Target name is already taken by another section.
    NameCollision(String),
    /// Named section is not in the current list.
    SectionNotFound(String),
    /// Positional index outside the current entry list.
    IndexOutOfRange { index: usize, len: usize },
    /// Section list write succeeded but item-key cleanup did not; the store
    /// may hold a dangling items key or orphaned backup.
    CleanupFailed { section: String, source: KvError },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "{err}"),
            Self::Serde(err) => write!(f, "failed to encode persisted value: {err}"),
            Self::EmptyName => write!(f, "section name cannot be empty"),
            Self::NameCollision(name) => write!(f, "section name already exists: `{name}`"),
            Self::SectionNotFound(name) => write!(f, "section not found: `{name}`"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "entry index {index} is out of range for {len} entries")
            }
            Self::CleanupFailed { section, source } => write!(
                f,
                "section `{section}` was removed but item cleanup failed: {source}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::CleanupFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}
