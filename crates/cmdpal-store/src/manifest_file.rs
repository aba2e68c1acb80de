//! Manifest Writer
//!
//! Reads the persisted manifest from disk and writes it back atomically
//! with stable formatting (4-space indent, trailing newline).

#![allow(clippy::result_large_err)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cmdpal_core::manifest::PersistedManifest;
use cmdpal_core::model::PaletteEntry;
use tracing::{debug, info};

use crate::atomic::atomic_write;
use crate::errors::{io_error_at, manifest_error, Result};

/// The manifest document at a fixed path
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing file reads as an empty document
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `InvalidManifest` if it is not a
    /// JSON object.
    pub fn read(&self) -> Result<PersistedManifest> {
        match fs::read(&self.path) {
            Ok(bytes) => PersistedManifest::from_slice(&bytes)
                .map_err(|e| manifest_error("read_manifest", &self.path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Manifest not found, starting empty");
                Ok(PersistedManifest::default())
            }
            Err(e) => Err(io_error_at("read_manifest", &self.path, e)),
        }
    }

    /// Load the document and its pairing-validated entries
    ///
    /// # Errors
    ///
    /// As [`ManifestFile::read`], plus `ManifestCorrupt` when the two
    /// arrays are not positionally paired.
    pub fn read_entries(&self) -> Result<(PersistedManifest, Vec<PaletteEntry>)> {
        let document = self.read()?;
        let entries = document
            .entries()
            .map_err(|e| manifest_error("read_manifest", &self.path, e))?;
        Ok((document, entries))
    }

    /// Atomically replace the file with `document`
    ///
    /// # Errors
    ///
    /// `Serialization` or `Io`; on failure the previous file is untouched.
    pub fn write(&self, document: &PersistedManifest) -> Result<()> {
        let bytes = document
            .to_pretty_bytes()
            .map_err(|e| manifest_error("write_manifest", &self.path, e))?;
        atomic_write(&self.path, &bytes)?;
        info!(path = %self.path.display(), bytes = bytes.len(), "Wrote manifest");
        Ok(())
    }

    /// Replace the palette entries of `document` and write it
    ///
    /// # Errors
    ///
    /// As [`ManifestFile::write`], plus `InvalidManifest` if an enclosing
    /// section has the wrong type.
    pub fn write_entries(&self, mut document: PersistedManifest, entries: &[PaletteEntry]) -> Result<()> {
        document
            .set_entries(entries)
            .map_err(|e| manifest_error("write_manifest", &self.path, e))?;
        self.write(&document)
    }
}
