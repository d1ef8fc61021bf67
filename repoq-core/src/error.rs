//! Error types for repoq-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for repoq-core operations.
pub type Result<T> = std::result::Result<T, RepoqError>;

/// Exit status used when the user interrupts a run.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Exit status used for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Errors that can occur while packaging a repository and querying a model.
#[derive(Error, Debug)]
pub enum RepoqError {
    /// Neither the packaging tool nor a working runner is available.
    #[error("{reason}. Install it with: {remedy}")]
    DependencyMissing {
        /// What was missing or what failed while probing.
        reason: String,
        /// Command the user can run to fix the problem.
        remedy: String,
    },

    /// The repository path does not exist.
    #[error("Repository path does not exist: {}", path.display())]
    PathNotFound {
        /// Path as given by the caller.
        path: PathBuf,
    },

    /// The packaging tool exited with a non-zero status.
    #[error("repomix failed ({}): {detail}", describe_status(status))]
    PackagingFailed {
        /// Exit code, if the process exited normally.
        status: Option<i32>,
        /// Diagnostic output captured from the tool.
        detail: String,
    },

    /// The inference credential is not set.
    #[error("{var} environment variable not set")]
    CredentialMissing {
        /// Name of the environment variable that was checked.
        var: &'static str,
    },

    /// The inference request failed.
    #[error("Inference request failed: {message}")]
    InferenceFailed {
        /// Description of the failure.
        message: String,
    },

    /// The run was interrupted by the user.
    #[error("Interrupted by user")]
    Interrupted,

    /// Filesystem error while reading or writing cache or output files.
    #[error("{context}: {source}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl RepoqError {
    /// Wrap an IO error with a short description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RepoqError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RepoqError::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}
