//! List supported models.

use repoq_core::models::{DEFAULT_MODEL, SUPPORTED_MODELS};

/// Render the model list, marking the default.
pub fn render() -> String {
    let mut output = String::from("Supported models:\n");
    for model in SUPPORTED_MODELS {
        let marker = if *model == DEFAULT_MODEL { " (default)" } else { "" };
        output.push_str(&format!("  - {}{}\n", model, marker));
    }
    output
}

/// Print the model list. Touches no cache, network or tools.
pub fn run() {
    print!("{}", render());
}
