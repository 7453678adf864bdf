//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `daybook_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("daybook_core version={}", daybook_core::core_version());
    println!(
        "daybook_core schema_version={}",
        daybook_core::db::migrations::latest_version()
    );
}
