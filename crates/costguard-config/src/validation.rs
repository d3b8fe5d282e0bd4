// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as strictly-positive limits and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CostGuardConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CostGuardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Limits are unlimited when unset, but must be strictly positive when set.
    if let Some(max_cost) = config.guardrails.max_cost_per_request
        && max_cost <= 0.0
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "guardrails.max_cost_per_request must be > 0, got {max_cost}"
            ),
        });
    }

    if let Some(budget) = config.guardrails.budget_limit
        && budget <= 0.0
    {
        errors.push(ConfigError::Validation {
            message: format!("guardrails.budget_limit must be > 0, got {budget}"),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
