//! Flat-directory artifact store for savepoint
//!
//! Persists one blob per key as a single file inside one directory. Presence
//! of a correctly named file is the only bookkeeping: there is no index or
//! manifest, and entries are never expired by the store itself.
//!
//! Writes go through a temporary file followed by an atomic rename, so a
//! reader in the same process never observes a partially written artifact.
//! Concurrent processes targeting the same key race with last-writer-wins
//! semantics; callers that need stronger guarantees must add their own
//! locking above this crate.

mod error;

pub use error::{Error, Result};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key→blob store backed by a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`.
    ///
    /// The directory is not created until the first `put`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Check whether an artifact exists for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed.
    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.artifact_path(key)?.exists())
    }

    /// Load the artifact stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no artifact exists for the key, or an
    /// I/O error if the read fails.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(key)?;
        if !path.exists() {
            return Err(Error::not_found(key));
        }
        fs::read(&path).map_err(|e| Error::io(e, &path, "read"))
    }

    /// Store `data` under `key`, creating the root directory if absent.
    ///
    /// An existing artifact under the same key is replaced in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or any I/O step fails.
    pub fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.artifact_path(key)?;

        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
        }

        // Write through a temp file and rename so readers never see a torn
        // artifact. The leading dot keeps the name out of key space.
        let tmp_path = self.root.join(format!(".{key}.tmp"));
        let mut file =
            fs::File::create(&tmp_path).map_err(|e| Error::io(e, &tmp_path, "create"))?;
        file.write_all(data)
            .map_err(|e| Error::io(e, &tmp_path, "write"))?;
        file.sync_all()
            .map_err(|e| Error::io(e, &tmp_path, "sync"))?;
        drop(file);

        fs::rename(&tmp_path, &path).map_err(|e| Error::io(e, &path, "rename"))?;
        tracing::debug!(key, path = %path.display(), "stored artifact");
        Ok(())
    }
}

/// Keys are embedded directly in file names, so reject anything that could
/// traverse out of the root or shadow an in-flight temp file.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_key(key));
    }
    let safe = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !safe || key.starts_with('.') {
        return Err(Error::invalid_key(key));
    }
    Ok(())
}
