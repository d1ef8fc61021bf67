//! Supported inference models.

/// Model used when none is requested.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Every model id the CLI accepts, in display order.
pub const SUPPORTED_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-flash-latest",
    "gemini-flash-lite-latest",
];

/// Whether `model` is one of [`SUPPORTED_MODELS`].
pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_supported() {
        assert!(is_supported(DEFAULT_MODEL));
    }

    #[test]
    fn test_unknown_model() {
        assert!(!is_supported("gpt-4o"));
        assert!(!is_supported(""));
    }
}
