//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable key-value contract the store layer depends on.
//! - Isolate SQLite query details from store/archive orchestration.
//!
//! # Invariants
//! - Each key's write is independently atomic; multi-key sequences are not
//!   transactional and callers must not assume otherwise.

pub mod kv_store;
