// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guardrail enforcement with a strict precedence order.
//!
//! Checks run in a fixed sequence: per-request ceiling, budget, anomalies.
//! Each check may only raise the cumulative severity; the final action is
//! the maximum seen, and the check that produced it supplies the message.
//! A resolved Block or Throttle surfaces as a [`GuardrailViolation`] so
//! callers are forced to handle both outcomes.

use costguard_config::GuardrailsConfig;
use costguard_core::{BudgetState, EnforcementAction, UsageEvent};
use thiserror::Error;
use tracing::warn;

use crate::anomaly::{AnomalyEvent, AnomalySeverity};
use crate::baseline::{BaselineResult, BaselineState};

/// A guardrail resolved to a blocking action.
///
/// This is expected control flow, not a bug condition: callers translate it
/// into a rejected request or a non-zero exit status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GuardrailViolation {
    /// The resolved action (always Block or Throttle).
    pub action: EnforcementAction,
    /// Explanation from the check that produced the action.
    pub message: String,
}

/// Running resolution: the most severe action seen so far and its message.
///
/// The update rule is strictly `new > current`, so an equally-severe later
/// check never overwrites an earlier message.
struct Resolution {
    action: EnforcementAction,
    message: String,
}

impl Resolution {
    fn new() -> Self {
        Self {
            action: EnforcementAction::Allow,
            message: String::new(),
        }
    }

    fn escalate(&mut self, action: EnforcementAction, message: String) {
        if action > self.action {
            self.action = action;
            self.message = message;
        }
    }
}

/// Enforce guardrails for one event, in strict precedence order.
///
/// 1. Per-request ceiling — always resolves to Block (not configurable).
/// 2. Budget breach — resolves to the configured breach action.
/// 3. Anomalies — only against a WARM baseline, mapped by severity.
///
/// Returns the resolved action for Allow/Warn/Downgrade; fails with a
/// [`GuardrailViolation`] carrying the action and message for
/// Block/Throttle.
pub fn enforce_guardrails(
    feature: &str,
    model: &str,
    config: &GuardrailsConfig,
    baseline: &BaselineResult,
    current: &UsageEvent,
    anomalies: &[AnomalyEvent],
    budget_state: &BudgetState,
) -> Result<EnforcementAction, GuardrailViolation> {
    let mut resolution = Resolution::new();

    // 1. Per-request ceiling: the highest-precedence signal, hardcoded Block.
    if let Some(max_cost) = config.max_cost_per_request
        && current.estimated_cost > max_cost
    {
        resolution.escalate(
            EnforcementAction::Block,
            format!(
                "Request cost ${:.4} exceeds maximum allowed ${:.4} for {feature}/{model}",
                current.estimated_cost, max_cost
            ),
        );
    }

    // 2. Budget breach.
    if let Some(budget_limit) = config.budget_limit
        && budget_state.amount_remaining <= 0.0
    {
        resolution.escalate(
            config.on_budget_breach,
            format!(
                "Budget limit of ${:.2} reached for {feature}. Current spend: ${:.2}",
                budget_limit, budget_state.amount_used
            ),
        );
    }

    // 3. Anomalies, only against a trustworthy baseline.
    if baseline.state == BaselineState::Warm {
        for anomaly in anomalies {
            match anomaly.severity {
                AnomalySeverity::Critical => resolution.escalate(
                    config.on_critical_anomaly,
                    format!(
                        "Critical anomaly detected in {feature}/{model}: {}",
                        anomaly.message
                    ),
                ),
                AnomalySeverity::Warning => resolution.escalate(
                    config.on_warning_anomaly,
                    format!("Warning anomaly in {feature}/{model}: {}", anomaly.message),
                ),
            }
        }
    }

    if resolution.action != EnforcementAction::Allow {
        warn!(
            feature,
            model,
            action = %resolution.action,
            message = %resolution.message,
            "guardrail triggered"
        );
    }

    if resolution.action.is_blocking() {
        return Err(GuardrailViolation {
            action: resolution.action,
            message: resolution.message,
        });
    }

    Ok(resolution.action)
}
