//! SQLite-backed state store
//!
//! One database per machine. The global partition is shared by every
//! workspace; each workspace partition is keyed by the workspace's name
//! (for the CLI, its canonical directory).

#![allow(clippy::result_large_err)]

use std::path::Path;
use std::sync::Mutex;

use cmdpal_core::errors::{ExError, ExErrorKind};
use cmdpal_core::host::{Partition, StateStore};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::db;
use crate::errors::{from_rusqlite, stored_value_error, Result};
use crate::migrations::apply_migrations;

const GLOBAL_PARTITION: &str = "global";

/// Durable key/value state in SQLite
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
    workspace_partition: String,
}

impl SqliteStateStore {
    /// Open (creating and migrating as needed) the database at `path`
    ///
    /// # Errors
    ///
    /// `Persistence` if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, workspace: &str) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::errors::io_error_at("create_state_dir", parent, e))?;
            }
        }
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::from_connection(conn, workspace)
    }

    /// In-memory store (for testing)
    ///
    /// # Errors
    ///
    /// `Persistence` if the schema cannot be created.
    pub fn open_in_memory(workspace: &str) -> Result<Self> {
        Self::from_connection(db::open_in_memory()?, workspace)
    }

    fn from_connection(mut conn: Connection, workspace: &str) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            workspace_partition: format!("workspace/{}", workspace),
        })
    }

    fn partition_name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Global => GLOBAL_PARTITION,
            Partition::Workspace => &self.workspace_partition,
        }
    }

    fn lock(&self, op: &str) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op(op)
                .with_message("state database lock poisoned")
        })
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>> {
        let conn = self.lock("state_get")?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM state WHERE partition = ?1 AND key = ?2",
                rusqlite::params![self.partition_name(partition), key],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        raw.map(|text| serde_json::from_str(&text).map_err(|e| stored_value_error(key, e)))
            .transpose()
    }

    fn set(&self, partition: Partition, key: &str, value: Option<Value>) -> Result<()> {
        let conn = self.lock("state_set")?;
        let partition = self.partition_name(partition);
        match value {
            Some(value) => {
                let text = value.to_string();
                conn.execute(
                    "INSERT INTO state (partition, key, value, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(partition, key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    rusqlite::params![partition, key, text, chrono::Utc::now().timestamp()],
                )
                .map_err(from_rusqlite)?;
            }
            None => {
                conn.execute(
                    "DELETE FROM state WHERE partition = ?1 AND key = ?2",
                    rusqlite::params![partition, key],
                )
                .map_err(from_rusqlite)?;
            }
        }
        Ok(())
    }
}
