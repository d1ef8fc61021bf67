//! Packaged-repository cache.
//!
//! Each repository gets exactly one cache slot: a plain-text file holding the
//! output of the packaging tool. Slots are named from a fingerprint of the
//! canonical repository path, so every run against the same directory finds
//! the same file without any index or coordination.
//!
//! # Cache Layout
//!
//! ```text
//! $TMPDIR/
//!   repomix-3f9a0c1be27d.txt    <- /home/me/src/project
//!   repomix-a41c77d0e5f2.txt    <- /home/me/src/other
//! ```
//!
//! Slots are reused regardless of changes to the repository and are never
//! expired here; the OS temp reaper or the user removes them. Writes go
//! through a sibling staging file and a rename, so a reader never sees a
//! half-written slot. Two processes writing the same slot at once is
//! last-writer-wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::constants::{CACHE_FILE_PREFIX, FINGERPRINT_LEN};
use crate::error::{RepoqError, Result};
use crate::packager::PackagedRepository;

/// A canonicalized repository location.
///
/// Construction resolves symlinks and relative components, so different
/// spellings of one directory compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryPath(PathBuf);

impl RepositoryPath {
    /// Resolve `path` to its canonical absolute form.
    ///
    /// Fails with [`RepoqError::PathNotFound`] when the path does not exist.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.canonicalize() {
            Ok(canonical) => Ok(Self(canonical)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RepoqError::PathNotFound {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(RepoqError::io(
                format!("Failed to resolve {}", path.display()),
                e,
            )),
        }
    }

    /// The canonical path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// Compute the cache fingerprint for a canonical path.
///
/// BLAKE3 over the path bytes, truncated to [`FINGERPRINT_LEN`] hex characters.
pub fn fingerprint(path: &Path) -> String {
    let digest = blake3::hash(path.as_os_str().as_encoded_bytes());
    let mut hex = digest.to_hex().to_string();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// The file location holding one repository's packaged content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    key: String,
    path: PathBuf,
}

impl CacheSlot {
    /// Fingerprint this slot is named after.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Location of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the packaging tool writes to before it is committed.
    pub fn staging_path(&self) -> PathBuf {
        self.path.with_extension(format!("partial-{}", std::process::id()))
    }

    /// Claim the staging file for a write.
    ///
    /// The file is removed when the returned guard is dropped without being
    /// committed, including when a pending write is cancelled.
    pub fn stage(&self) -> StagedFile {
        StagedFile {
            path: self.staging_path(),
            committed: false,
        }
    }

    /// Whether the slot file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size and modification time of the slot file, if present.
    pub fn info(&self) -> Option<SlotInfo> {
        let metadata = fs::metadata(&self.path).ok()?;
        Some(SlotInfo {
            size_bytes: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// A staging file that is deleted on drop unless committed into its slot.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Location of the staging file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            match fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!("Removed staging file {:?}", self.path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {:?}: {}", self.path, e),
            }
        }
    }
}

/// Metadata about an existing cache slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotInfo {
    /// File size in bytes.
    pub size_bytes: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Maps repositories to cache slots inside one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl CacheStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The slot for a repository. Depends only on the canonical path.
    pub fn slot_for(&self, repo: &RepositoryPath) -> CacheSlot {
        let key = fingerprint(repo.as_path());
        let path = self.dir.join(format!("{CACHE_FILE_PREFIX}{key}.txt"));
        CacheSlot { key, path }
    }

    /// Read a slot's content.
    ///
    /// Returns `None` if the slot has not been written yet.
    pub fn read(&self, slot: &CacheSlot) -> Result<Option<PackagedRepository>> {
        match fs::read_to_string(slot.path()) {
            Ok(content) => {
                tracing::debug!(
                    "Read {} bytes from cache slot {:?}",
                    content.len(),
                    slot.path()
                );
                Ok(Some(PackagedRepository::new(content)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cache slot at {:?}", slot.path());
                Ok(None)
            }
            Err(e) => Err(RepoqError::io(
                format!("Failed to read cache file {}", slot.path().display()),
                e,
            )),
        }
    }

    /// Write content into a slot, replacing any previous content.
    pub fn write(&self, slot: &CacheSlot, content: &str) -> Result<()> {
        self.ensure_dir()?;
        let staged = slot.stage();
        fs::write(staged.path(), content).map_err(|e| {
            RepoqError::io(
                format!("Failed to write cache file {}", staged.path().display()),
                e,
            )
        })?;
        self.commit(slot, staged)
    }

    /// Move a fully written staging file into the slot.
    ///
    /// On failure the staging file is removed when `staged` drops.
    pub fn commit(&self, slot: &CacheSlot, mut staged: StagedFile) -> Result<()> {
        fs::rename(staged.path(), slot.path()).map_err(|e| {
            RepoqError::io(
                format!("Failed to update cache file {}", slot.path().display()),
                e,
            )
        })?;
        staged.committed = true;
        tracing::debug!("Committed cache slot {:?}", slot.path());
        Ok(())
    }

    /// Create the cache directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            RepoqError::io(
                format!("Failed to create cache directory {}", self.dir.display()),
                e,
            )
        })
    }
}
