//! repoq configuration loading from `.repoqrc.toml`.
//!
//! Configuration is optional - repoq uses sensible defaults if no config file
//! exists. Command-line flags always take precedence over the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [model]
//! default = "gemini-2.5-pro"
//!
//! [cache]
//! enabled = true
//! directory = "/var/tmp/repoq"
//!
//! [packager]
//! tool = "repomix"
//! runner = "npx"
//! probe_timeout_secs = 120
//!
//! [inference]
//! base_url = "https://generativelanguage.googleapis.com"
//!
//! [output]
//! color = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use repoq_core::constants::{DEFAULT_BASE_URL, PACKAGE_RUNNER, PACKAGING_TOOL, PROBE_TIMEOUT};
use repoq_core::models::{self, DEFAULT_MODEL};
use serde::Deserialize;

/// Config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".repoqrc.toml";

/// Root configuration structure loaded from `.repoqrc.toml`.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct RepoqConfig {
    /// Model selection.
    #[serde(default)]
    pub model: ModelConfig,

    /// Packaged-repository cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Packaging tool discovery.
    #[serde(default)]
    pub packager: PackagerConfig,

    /// Inference endpoint.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Model selection.
#[derive(Debug, Deserialize, Default)]
pub struct ModelConfig {
    /// Model used when `--model` is not given.
    #[serde(default)]
    pub default: Option<String>,
}

/// Cache configuration.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Whether cached snapshots are reused.
    ///
    /// When `false`, every run repackages the repository as if `--no-cache`
    /// had been passed.
    ///
    /// Default: `true`
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Directory holding cache slots.
    ///
    /// If not specified, the OS temp directory is used.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

/// Packaging tool discovery.
#[derive(Debug, Deserialize, Default)]
pub struct PackagerConfig {
    /// Packaging tool executable name (default: `repomix`).
    #[serde(default)]
    pub tool: Option<String>,

    /// Package runner used as fallback (default: `npx`).
    #[serde(default)]
    pub runner: Option<String>,

    /// Timeout for the runner's version probe, in seconds (default: 120).
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
}

/// Inference endpoint configuration.
#[derive(Debug, Deserialize, Default)]
pub struct InferenceConfig {
    /// Base URL of the Gemini API.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Output formatting preferences.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Whether to use colored output.
    ///
    /// Defaults to auto-detection when unset.
    #[serde(default)]
    pub color: Option<bool>,
}

impl RepoqConfig {
    /// Load configuration from `.repoqrc.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Model to use when none is given on the command line.
    ///
    /// Unsupported ids in the config are ignored with a warning.
    pub fn default_model(&self) -> &str {
        match self.model.default.as_deref() {
            Some(model) if models::is_supported(model) => model,
            Some(model) => {
                tracing::warn!(
                    "Unsupported model '{}' in {}, using {}",
                    model,
                    CONFIG_FILE,
                    DEFAULT_MODEL
                );
                DEFAULT_MODEL
            }
            None => DEFAULT_MODEL,
        }
    }

    /// Check if cached snapshots may be reused.
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled
    }

    /// Cache directory, defaulting to the OS temp directory.
    pub fn cache_directory(&self) -> PathBuf {
        self.cache
            .directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn packaging_tool(&self) -> &str {
        self.packager.tool.as_deref().unwrap_or(PACKAGING_TOOL)
    }

    pub fn package_runner(&self) -> &str {
        self.packager.runner.as_deref().unwrap_or(PACKAGE_RUNNER)
    }

    pub fn probe_timeout(&self) -> Duration {
        self.packager
            .probe_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(PROBE_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        self.inference.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Check if colored output should be used.
    ///
    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RepoqConfig::default();
        assert!(config.cache_enabled());
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert_eq!(config.cache_directory(), std::env::temp_dir());
        assert_eq!(config.packaging_tool(), "repomix");
        assert_eq!(config.package_runner(), "npx");
        assert_eq!(config.probe_timeout(), Duration::from_secs(120));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(config.use_color().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[model]
default = "gemini-2.5-pro"

[cache]
enabled = false
directory = "/var/tmp/repoq"

[packager]
tool = "packer"
runner = "bunx"
probe_timeout_secs = 30

[inference]
base_url = "http://localhost:8080"

[output]
color = false
"#;
        let config: RepoqConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.default_model(), "gemini-2.5-pro");
        assert!(!config.cache_enabled());
        assert_eq!(config.cache_directory(), PathBuf::from("/var/tmp/repoq"));
        assert_eq!(config.packaging_tool(), "packer");
        assert_eq!(config.package_runner(), "bunx");
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.use_color(), Some(false));
    }

    #[test]
    fn test_unsupported_default_model_falls_back() {
        let config: RepoqConfig = toml::from_str("[model]\ndefault = \"gpt-4o\"\n").unwrap();
        assert_eq!(config.default_model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_partial_cache_section_keeps_enabled_default() {
        let config: RepoqConfig = toml::from_str("[cache]\ndirectory = \"/tmp/x\"\n").unwrap();
        assert!(config.cache_enabled());
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let dir = TempDir::new().unwrap();
        let config = RepoqConfig::load(dir.path());
        assert!(config.cache_enabled());

        std::fs::write(dir.path().join(CONFIG_FILE), "[cache\nenabled = ").unwrap();
        let config = RepoqConfig::load(dir.path());
        assert!(config.cache_enabled());
        assert_eq!(config.default_model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[inference]\nbase_url = \"http://127.0.0.1:1234\"\n",
        )
        .unwrap();

        let config = RepoqConfig::load(dir.path());
        assert_eq!(config.base_url(), "http://127.0.0.1:1234");
    }
}
