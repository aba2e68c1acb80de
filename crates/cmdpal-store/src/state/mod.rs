//! Durable key/value state backends

mod sqlite_state;

pub use sqlite_state::SqliteStateStore;
