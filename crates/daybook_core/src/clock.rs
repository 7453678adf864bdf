//! Time source seam for store and backup timestamps.
//!
//! # Responsibility
//! - Provide the single wall-clock access point for core code.
//! - Format timestamps the way the persisted wire format expects.
//!
//! # Invariants
//! - Core code never calls `Utc::now()` directly; it goes through [`Clock`]
//!   so tests control entry ids and envelope timestamps deterministically.

use chrono::{DateTime, SecondsFormat, Utc};

/// Wall-clock capability injected into every store component.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Formats a timestamp as ISO-8601 with millisecond precision and `Z` suffix,
/// e.g. `2026-08-06T09:15:30.120Z`. This is the wire format for entry
/// timestamps, backup envelopes and archive metadata.
pub fn to_iso_millis(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
