//! Output formatting helpers for the repoq CLI.
//!
//! The token-usage and cost lines are parsed by automation, so their shape is
//! fixed and they are printed even in quiet mode.

use std::time::Duration;

use colored::Colorize;
use repoq_core::TokenUsage;

/// Width of the `=` rule framing the response banner.
const BANNER_WIDTH: usize = 60;

/// Format an integer with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Human-readable age such as `42s ago` or `3h ago`.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86400)
    }
}

/// `Token usage: <in> input, <out> output, <total> total`
pub fn token_usage_line(usage: &TokenUsage) -> String {
    format!(
        "Token usage: {} input, {} output, {} total",
        format_count(usage.input_tokens),
        format_count(usage.output_tokens),
        format_count(usage.total_tokens)
    )
}

/// `Estimated cost: $<amount> (<model>)`
pub fn cost_line(cost: f64, model: &str) -> String {
    format!("Estimated cost: ${:.4} ({})", cost, model)
}

/// Banner printed before the answer in interactive mode.
pub fn response_banner() -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!("\n{}\n{}\n{}\n", rule, "Response:".cyan().bold(), rule)
}

/// Green check mark used for narrative status lines.
pub fn check() -> colored::ColoredString {
    "✓".green()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
        assert_eq!(format_count(100_000), "100,000");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(5)), "5s ago");
        assert_eq!(format_age(Duration::from_secs(125)), "2m ago");
        assert_eq!(format_age(Duration::from_secs(7_200)), "2h ago");
        assert_eq!(format_age(Duration::from_secs(3 * 86_400 + 10)), "3d ago");
    }

    #[test]
    fn test_token_usage_line() {
        let usage = TokenUsage {
            input_tokens: 1_234_567,
            output_tokens: 890,
            total_tokens: 1_235_457,
        };
        assert_eq!(
            token_usage_line(&usage),
            "Token usage: 1,234,567 input, 890 output, 1,235,457 total"
        );
    }

    #[test]
    fn test_cost_line() {
        assert_eq!(
            cost_line(0.01923, "gemini-2.5-flash"),
            "Estimated cost: $0.0192 (gemini-2.5-flash)"
        );
        assert_eq!(cost_line(0.0, "x"), "Estimated cost: $0.0000 (x)");
    }
}
