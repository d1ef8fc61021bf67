//! Runs the packaging tool against a repository.
//!
//! The tool writes its output to the cache slot's staging file, which is then
//! committed into the slot and read back. The in-memory content is therefore
//! always exactly what the slot holds, and the next cached run reuses it
//! without invoking the tool again.

use std::process::Stdio;

use crate::cache::{CacheSlot, CacheStore, RepositoryPath};
use crate::constants::CHARS_PER_TOKEN;
use crate::error::{RepoqError, Result};
use crate::resolver::ToolInvocation;

/// Flattened text of a whole repository.
///
/// Treated as an opaque document; no structure is parsed out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedRepository {
    content: String,
}

impl PackagedRepository {
    /// Wrap packaged text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// The packaged text.
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Length in characters.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Rough token estimate for display purposes.
    pub fn estimated_tokens(&self) -> usize {
        self.char_count() / CHARS_PER_TOKEN
    }
}

/// Invokes a resolved packaging tool.
pub struct Packager<'a> {
    invocation: &'a ToolInvocation,
}

impl<'a> Packager<'a> {
    /// Packager that runs `invocation`.
    pub fn new(invocation: &'a ToolInvocation) -> Self {
        Self { invocation }
    }

    /// Package `repo` into `slot` and return the slot's content.
    pub async fn pack(
        &self,
        repo: &RepositoryPath,
        store: &CacheStore,
        slot: &CacheSlot,
    ) -> Result<PackagedRepository> {
        store.ensure_dir()?;
        // Removed on every exit path short of a successful commit, including
        // cancellation of this future.
        let staged = slot.stage();

        let mut command = self.invocation.command();
        command
            .arg("--output")
            .arg(staged.path())
            .arg("--style")
            .arg("plain")
            .arg(repo.as_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            "Packing {:?} with {} into {:?}",
            repo.as_path(),
            self.invocation,
            staged.path()
        );

        let output = command
            .output()
            .await
            .map_err(|e| RepoqError::io(format!("Failed to run {}", self.invocation), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(RepoqError::PackagingFailed {
                status: output.status.code(),
                detail,
            });
        }

        if !staged.path().is_file() {
            return Err(RepoqError::io(
                format!("repomix produced no output for {}", slot.path().display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        store.commit(slot, staged)?;
        store.read(slot)?.ok_or_else(|| {
            RepoqError::io(
                format!("Cache file vanished after packing: {}", slot.path().display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )
        })
    }
}
