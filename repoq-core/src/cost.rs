//! Cost estimation from token usage.
//!
//! Prices are a static table in USD per 1M tokens. Unknown models are priced
//! at zero: the estimate is advisory and never blocks a run.

use crate::inference::TokenUsage;

/// Per-model pricing in USD per 1M tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingEntry {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl PricingEntry {
    /// Price used for models missing from the table.
    pub const ZERO: PricingEntry = PricingEntry {
        input_per_million: 0.0,
        output_per_million: 0.0,
    };

    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost of a request with the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 * self.input_per_million / 1_000_000.0
            + output_tokens as f64 * self.output_per_million / 1_000_000.0
    }
}

/// Pricing table (as of Jan 2026).
const PRICING: &[(&str, PricingEntry)] = &[
    ("gemini-3-pro-preview", PricingEntry::new(2.00, 12.00)),
    ("gemini-3-flash-preview", PricingEntry::new(0.15, 0.60)),
    ("gemini-2.5-pro", PricingEntry::new(1.25, 10.00)),
    ("gemini-2.5-flash", PricingEntry::new(0.15, 0.60)),
    ("gemini-flash-latest", PricingEntry::new(0.15, 0.60)),
    ("gemini-flash-lite-latest", PricingEntry::new(0.10, 0.40)),
];

/// Look up pricing for a model, falling back to [`PricingEntry::ZERO`].
pub fn pricing_for(model: &str) -> PricingEntry {
    PRICING
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, entry)| *entry)
        .unwrap_or(PricingEntry::ZERO)
}

/// Estimated USD cost of a response.
pub fn estimate(usage: &TokenUsage, model: &str) -> f64 {
    pricing_for(model).cost(usage.input_tokens, usage.output_tokens)
}
