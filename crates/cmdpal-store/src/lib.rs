//! cmdpal store - filesystem and SQLite persistence
//!
//! Provides:
//! - Atomic temp→rename writes
//! - Manifest Writer over the persisted manifest file
//! - Per-scope script cache with staleness detection and atomic refresh
//! - SQLite-backed state store with an embedded migrations framework

pub mod atomic;
pub mod db;
pub mod errors;
pub mod manifest_file;
pub mod migrations;
pub mod script_cache;
pub mod state;

// Re-export key types
pub use errors::Result;
pub use manifest_file::ManifestFile;
pub use script_cache::{CachedScript, ScriptCache, Staleness};
pub use state::SqliteStateStore;
