//! Script cache
//!
//! One directory per scope (`global` or the workspace ScopeId) under a
//! fixed root, holding a single copy of the configured script:
//!
//! ```text
//! <root>/global/<source stem>.<ext>
//! <root>/<ScopeId>/<source stem>.<ext>
//! ```
//!
//! A cached copy is refreshed when the configured path changed, the copy
//! is missing, or the copy is older than the source. Refresh stages the
//! copy in a sibling directory, checks its SHA-256 against the source
//! bytes, then swaps the directory in, so a crash never leaves a half
//! copied script behind.

#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::atomic::write_synced;
use crate::errors::{cache_digest_mismatch, io_error_at, Result};

/// Why a cached copy must be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    /// The configured source path differs from the last one used
    SourceChanged,
    /// No cached copy exists
    Missing,
    /// The cached copy is older than the source
    Outdated,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

/// A resolved cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedScript {
    pub path: PathBuf,
    pub refreshed: bool,
}

/// Per-scope cache of external scripts
#[derive(Debug, Clone)]
pub struct ScriptCache {
    root: PathBuf,
}

impl ScriptCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scope_dir(&self, scope_key: &str) -> PathBuf {
        self.root.join(scope_key)
    }

    /// Where the copy of `source` lives for `scope_key`
    pub fn cached_path(&self, scope_key: &str, source: &Path, extension: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string());
        self.scope_dir(scope_key)
            .join(format!("{}.{}", stem, extension))
    }

    /// Decide whether the cached copy must be refreshed
    ///
    /// # Errors
    ///
    /// `Io` if the source (or an existing copy) cannot be inspected.
    pub fn staleness(
        &self,
        source: &Path,
        last_used: Option<&Path>,
        cached: &Path,
    ) -> Result<Staleness> {
        if last_used != Some(source) {
            return Ok(Staleness::SourceChanged);
        }
        if !cached.exists() {
            return Ok(Staleness::Missing);
        }
        if modified(cached)? < modified(source)? {
            return Ok(Staleness::Outdated);
        }
        Ok(Staleness::Fresh)
    }

    /// Return a fresh cached copy of `source`, refreshing it if stale
    ///
    /// # Errors
    ///
    /// `Io` on any filesystem failure; the previous cached copy is kept.
    pub fn resolve(
        &self,
        scope_key: &str,
        source: &Path,
        last_used: Option<&Path>,
        extension: &str,
    ) -> Result<CachedScript> {
        let cached = self.cached_path(scope_key, source, extension);
        let staleness = self.staleness(source, last_used, &cached)?;
        if !staleness.is_stale() {
            debug!(scope = scope_key, path = %cached.display(), "Script cache is fresh");
            return Ok(CachedScript {
                path: cached,
                refreshed: false,
            });
        }

        info!(
            scope = scope_key,
            source = %source.display(),
            reason = ?staleness,
            "Refreshing script cache"
        );
        let path = self.refresh(scope_key, source, extension)?;
        Ok(CachedScript {
            path,
            refreshed: true,
        })
    }

    /// Recreate the scope directory holding a copy of `source`
    ///
    /// # Errors
    ///
    /// `Io` on any filesystem failure or if the staged copy does not
    /// match the source bytes.
    pub fn refresh(&self, scope_key: &str, source: &Path, extension: &str) -> Result<PathBuf> {
        let content = fs::read(source).map_err(|e| io_error_at("read_script", source, e))?;
        fs::create_dir_all(&self.root).map_err(|e| io_error_at("create_cache_root", &self.root, e))?;

        let staging = self
            .root
            .join(format!(".staging-{}", Uuid::new_v4().simple()));
        let result = self.stage_and_swap(&staging, scope_key, source, extension, &content);
        if result.is_err() && staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn stage_and_swap(
        &self,
        staging: &Path,
        scope_key: &str,
        source: &Path,
        extension: &str,
        content: &[u8],
    ) -> Result<PathBuf> {
        fs::create_dir(staging).map_err(|e| io_error_at("create_staging_dir", staging, e))?;

        let target = self.cached_path(scope_key, source, extension);
        let file_name = target.file_name().unwrap_or_default();
        let staged_file = staging.join(file_name);
        write_synced(&staged_file, content)?;

        let written = fs::read(&staged_file).map_err(|e| io_error_at("verify_copy", &staged_file, e))?;
        let expected = compute_digest(content);
        let actual = compute_digest(&written);
        if expected != actual {
            return Err(cache_digest_mismatch(&staged_file, &expected, &actual));
        }

        let scope_dir = self.scope_dir(scope_key);
        if scope_dir.exists() {
            fs::remove_dir_all(&scope_dir)
                .map_err(|e| io_error_at("remove_cache_dir", &scope_dir, e))?;
        }
        fs::rename(staging, &scope_dir).map_err(|e| io_error_at("swap_cache_dir", &scope_dir, e))?;

        Ok(target)
    }

    /// Remove the cached copy for a scope that no longer has a source
    ///
    /// # Errors
    ///
    /// `Io` if the directory exists and cannot be removed.
    pub fn teardown(&self, scope_key: &str) -> Result<bool> {
        let scope_dir = self.scope_dir(scope_key);
        if !scope_dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&scope_dir).map_err(|e| io_error_at("teardown_cache", &scope_dir, e))?;
        info!(scope = scope_key, "Removed script cache");
        Ok(true)
    }
}

/// SHA-256 of `content`, hex encoded
pub fn compute_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| io_error_at("stat", path, e))
}
