//! Shared constants for repoq.
//!
//! Centralizes names and magic numbers so they are discoverable in one place.

use std::time::Duration;

/// Packaging tool executable name.
pub const PACKAGING_TOOL: &str = "repomix";

/// Package runner used when the packaging tool is not installed.
pub const PACKAGE_RUNNER: &str = "npx";

/// Command suggested when the packaging tool cannot be found.
pub const INSTALL_HINT: &str = "npm install -g repomix";

/// How long the runner version probe may take.
///
/// The first `npx` invocation may download the tool, so this is generous.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Spinner tick interval in milliseconds.
pub const SPINNER_TICK_MS: u64 = 100;

/// Spinner glyphs, one per tick.
pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// File name prefix for cache slots.
pub const CACHE_FILE_PREFIX: &str = "repomix-";

/// Number of hex characters kept from the path digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Environment variable holding the inference credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default inference endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Rough characters-per-token ratio used for display estimates.
pub const CHARS_PER_TOKEN: usize = 4;
