//! Atomic write primitives
//!
//! Uses temp→rename so a reader sees either the old file or the new one,
//! never a partial write

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, io_error_at, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Atomically write bytes to a file
///
/// The temp file lives next to the target (same filesystem) and has a
/// unique name, so concurrent writers never share one.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error_at("create_parent_dir", parent, e))?;
        }
    }

    let temp_path = temp_path_for(target_path);
    if let Err(err) = write_synced(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, target_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        io_error_at("rename_temp", target_path, e)
    })?;

    Ok(())
}

/// Write `content` to a new file and flush it to disk
pub fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).map_err(|e| io_error_at("create_temp", path, e))?;
    file.write_all(content)
        .map_err(|e| io_error_at("write_temp", path, e))?;
    file.sync_all().map_err(|e| io_error("sync_temp", e))?;
    Ok(())
}

fn temp_path_for(target_path: &Path) -> PathBuf {
    let name = target_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target_path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}
