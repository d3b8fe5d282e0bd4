// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! The rate table is fixed at compile time: no dynamic fetching and no
//! fallback pricing. An unknown model is a hard error so cost records are
//! never silently mispriced. Totals round UP to whole cents.

use costguard_core::{CostGuardError, TokenUsage};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Per-1K-token pricing for a specific model, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPricing {
    /// Cost per 1K prompt tokens.
    pub prompt_cost_per_1k: Decimal,
    /// Cost per 1K completion tokens.
    pub completion_cost_per_1k: Decimal,
}

/// Look up pricing for a model identifier.
///
/// Returns `InvalidInput` for models outside the fixed table.
pub fn pricing_for(model: &str) -> Result<ModelPricing, CostGuardError> {
    match model {
        "gpt-4" => Ok(ModelPricing {
            prompt_cost_per_1k: dec!(30.00),
            completion_cost_per_1k: dec!(60.00),
        }),
        "gpt-3.5-turbo" => Ok(ModelPricing {
            prompt_cost_per_1k: dec!(1.50),
            completion_cost_per_1k: dec!(2.00),
        }),
        "claude-3-opus" => Ok(ModelPricing {
            prompt_cost_per_1k: dec!(15.00),
            completion_cost_per_1k: dec!(75.00),
        }),
        other => Err(CostGuardError::InvalidInput(format!(
            "unsupported model: {other}"
        ))),
    }
}

/// Calculate the total cost in USD for a model call.
///
/// Formula per side: `(tokens / 1000) * cost_per_1k`. The sum rounds UP
/// to 2 decimal places so estimates never understate spend.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> Result<f64, CostGuardError> {
    let pricing = pricing_for(model)?;

    let prompt_cost =
        Decimal::from(usage.prompt_tokens) / dec!(1000) * pricing.prompt_cost_per_1k;
    let completion_cost =
        Decimal::from(usage.completion_tokens) / dec!(1000) * pricing.completion_cost_per_1k;

    let total = (prompt_cost + completion_cost)
        .round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity);

    total.to_f64().ok_or_else(|| {
        CostGuardError::Internal(format!("cost {total} does not fit in an f64"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    #[test]
    fn gpt4_cost() {
        // 1000/1K * 30.00 + 500/1K * 60.00 = 30.00 + 30.00
        let cost = calculate_cost("gpt-4", &usage(1000, 500)).unwrap();
        assert!((cost - 60.00).abs() < 1e-10);
    }

    #[test]
    fn gpt35_turbo_cost() {
        // 2000/1K * 1.50 + 1000/1K * 2.00 = 3.00 + 2.00
        let cost = calculate_cost("gpt-3.5-turbo", &usage(2000, 1000)).unwrap();
        assert!((cost - 5.00).abs() < 1e-10);
    }

    #[test]
    fn claude_3_opus_cost() {
        let cost = calculate_cost("claude-3-opus", &usage(1000, 1000)).unwrap();
        assert!((cost - 90.00).abs() < 1e-10);
    }

    #[test]
    fn fractional_cost_rounds_up() {
        // 1/1K * 1.50 = 0.0015 -> rounds up to a whole cent.
        let cost = calculate_cost("gpt-3.5-turbo", &usage(1, 0)).unwrap();
        assert!((cost - 0.01).abs() < 1e-10);
    }

    #[test]
    fn zero_tokens_zero_cost() {
        let cost = calculate_cost("gpt-4", &TokenUsage::default()).unwrap();
        assert!((cost - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let err = calculate_cost("gpt-99", &usage(100, 100)).unwrap_err();
        assert!(matches!(err, CostGuardError::InvalidInput(_)));
        assert!(err.to_string().contains("gpt-99"));
    }

    #[test]
    fn pricing_lookup_is_exact_match_only() {
        assert!(pricing_for("gpt-4").is_ok());
        assert!(pricing_for("GPT-4").is_err());
        assert!(pricing_for("gpt-4-turbo").is_err());
    }
}
