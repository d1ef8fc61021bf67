//! Locates a usable packaging-tool invocation.
//!
//! Resolution is a two-step probe chain:
//!
//! 1. `repomix` on the search path is used directly, without spawning anything.
//! 2. Otherwise `npx` is probed with `npx --yes repomix --version` under a
//!    timeout. The first run may download the tool, so the probe shows a
//!    spinner. A successful probe makes `npx --yes repomix` the invocation.
//!
//! Only when both steps fail does resolution return
//! [`RepoqError::DependencyMissing`].

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::constants::{INSTALL_HINT, PACKAGE_RUNNER, PACKAGING_TOOL, PROBE_TIMEOUT};
use crate::error::{RepoqError, Result};
use crate::progress::ProgressIndicator;

/// How a packaging-tool invocation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The tool is installed and called directly.
    Direct,
    /// The tool is fetched and run through the package runner.
    Fallback,
}

/// Resolved command prefix for running the packaging tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    program: PathBuf,
    prefix_args: Vec<String>,
    provenance: Provenance,
}

impl ToolInvocation {
    /// Invocation of `program` with `prefix_args` ahead of the tool's own arguments.
    pub fn new(program: PathBuf, prefix_args: Vec<String>, provenance: Provenance) -> Self {
        Self {
            program,
            prefix_args,
            provenance,
        }
    }

    /// Executable that is spawned.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments placed before the tool's own arguments.
    pub fn prefix_args(&self) -> &[String] {
        &self.prefix_args
    }

    /// Whether the tool was found directly or through the runner.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// A command with the program and prefix arguments applied.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.prefix_args);
        command
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .program
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| self.program.to_string_lossy());
        write!(f, "{name}")?;
        for arg in &self.prefix_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Finds the packaging tool, falling back to the package runner.
#[derive(Debug, Clone)]
pub struct ToolResolver {
    tool: String,
    runner: String,
    probe_timeout: Duration,
    search_path: Option<OsString>,
    show_progress: bool,
}

impl Default for ToolResolver {
    fn default() -> Self {
        Self {
            tool: PACKAGING_TOOL.to_string(),
            runner: PACKAGE_RUNNER.to_string(),
            probe_timeout: PROBE_TIMEOUT,
            search_path: None,
            show_progress: false,
        }
    }
}

impl ToolResolver {
    /// Resolver for `repomix`, falling back to `npx`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the packaging tool executable name.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Override the package runner executable name.
    pub fn with_runner(mut self, runner: impl Into<String>) -> Self {
        self.runner = runner.into();
        self
    }

    /// Override how long the runner probe may take.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Search these directories instead of `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Show a spinner while probing the runner.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Resolve the invocation used to run the packaging tool.
    pub async fn resolve(&self) -> Result<ToolInvocation> {
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        let search_path = search_path.as_deref();

        if let Some(program) = find_executable(&self.tool, search_path) {
            tracing::debug!("Found {} at {:?}", self.tool, program);
            return Ok(ToolInvocation::new(program, Vec::new(), Provenance::Direct));
        }

        let Some(runner) = find_executable(&self.runner, search_path) else {
            return Err(RepoqError::DependencyMissing {
                reason: format!("Neither {} nor Node.js/{} found", self.tool, self.runner),
                remedy: format!("{INSTALL_HINT} (requires Node.js)"),
            });
        };

        tracing::debug!("{} not found, probing {:?}", self.tool, runner);
        let prefix_args = vec!["--yes".to_string(), self.tool.clone()];
        self.probe_runner(&runner, &prefix_args).await?;

        Ok(ToolInvocation::new(runner, prefix_args, Provenance::Fallback))
    }

    async fn probe_runner(&self, runner: &Path, prefix_args: &[String]) -> Result<()> {
        let probe = format!("{} {}", self.runner, prefix_args.join(" "));
        let indicator = ProgressIndicator::start(
            format!("Checking {probe} (first run may download packages)"),
            self.show_progress,
        );

        let mut command = Command::new(runner);
        command
            .args(prefix_args)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let failure = match tokio::time::timeout(self.probe_timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                indicator.stop(Some(format!("Found {probe}").as_str()));
                return Ok(());
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if stderr.is_empty() {
                    format!("{probe} --version exited with {}", output.status)
                } else {
                    stderr
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}s", self.probe_timeout.as_secs_f64()),
        };

        drop(indicator);
        tracing::debug!("Runner probe failed: {}", failure);
        Err(RepoqError::DependencyMissing {
            reason: format!("{probe} failed: {failure}"),
            remedy: INSTALL_HINT.to_string(),
        })
    }
}

/// Look up an executable by name in a `PATH`-style list of directories.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidate_names(name).map(move |candidate| dir.join(candidate)))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn candidate_names(name: &str) -> impl Iterator<Item = String> {
    std::iter::once(name.to_string())
}

#[cfg(not(unix))]
fn candidate_names(name: &str) -> impl Iterator<Item = String> {
    let name = name.to_string();
    ["", ".exe", ".cmd", ".bat"]
        .into_iter()
        .map(move |ext| format!("{name}{ext}"))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
