//! Per-model pricing and cost computation.
//!
//! Prices are USD per one million tokens. Lookup is by exact model id; an
//! unknown model costs nothing rather than failing the call.

use serde::{Deserialize, Serialize};

/// Prices for one model, per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    /// Reserved. Completion responses carry no cache-hit signal, so this tier
    /// is never charged.
    pub cached_input_per_million: f64,
    pub output_per_million: f64,
}

const PRICING_TABLE: &[(&str, ModelPricing)] = &[
    (
        "gpt-4o",
        ModelPricing {
            input_per_million: 2.5,
            cached_input_per_million: 1.25,
            output_per_million: 10.0,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            input_per_million: 0.15,
            cached_input_per_million: 0.075,
            output_per_million: 0.6,
        },
    ),
    (
        "o1",
        ModelPricing {
            input_per_million: 15.0,
            cached_input_per_million: 7.5,
            output_per_million: 60.0,
        },
    ),
    (
        "o3-mini",
        ModelPricing {
            input_per_million: 1.1,
            cached_input_per_million: 0.55,
            output_per_million: 4.4,
        },
    ),
];

/// Look up pricing for an exact model id.
pub fn model_pricing(model_id: &str) -> Option<ModelPricing> {
    PRICING_TABLE
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, pricing)| *pricing)
}

/// Model ids with known pricing, in table order.
pub fn priced_models() -> impl Iterator<Item = &'static str> {
    PRICING_TABLE.iter().map(|(id, _)| *id)
}

/// Cost in USD of one call, rounded to 4 decimal places.
///
/// Unknown models return `0.0`.
pub fn compute_cost(input_tokens: u64, output_tokens: u64, model_id: &str) -> f64 {
    let Some(pricing) = model_pricing(model_id) else {
        tracing::warn!(model = %model_id, "No pricing for model; recording zero cost");
        return 0.0;
    };
    let input_cost = input_tokens as f64 / 1_000_000.0 * pricing.input_per_million;
    let output_cost = output_tokens as f64 / 1_000_000.0 * pricing.output_per_million;
    round_cost(input_cost + output_cost)
}

/// Round to 4 decimal places, half away from zero.
pub fn round_cost(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Decimal string with exactly 4 places, e.g. `"0.0123"`.
pub fn cost_string(value: f64) -> String {
    format!("{:.4}", round_cost(value))
}

/// Display form, e.g. `"$0.0123"`.
pub fn format_cost(value: f64) -> String {
    format!("${}", cost_string(value))
}
