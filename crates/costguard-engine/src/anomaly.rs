// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anomaly detection for cost patterns.
//!
//! Three fixed threshold rules compare one current event against a WARM
//! baseline. The multipliers are deliberately constants, not configuration:
//! detection stays predictable and auditable. All comparisons are strict,
//! so a value exactly at a threshold never fires.

use costguard_core::{CostGuardError, UsageEvent};
use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::baseline::{BaselineResult, BaselineState};

/// Rule A: cost spike fires above `p90_cost * 1.5`.
pub const RULE_A_MULTIPLIER: f64 = 1.5;
/// Rule B: token explosion fires above `median_tokens * 1.7`.
pub const RULE_B_MULTIPLIER: f64 = 1.7;
/// Rule C: retry amplification fires above `p90_cost * 1.3`.
pub const RULE_C_MULTIPLIER: f64 = 1.3;

/// The three fixed anomaly rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum AnomalyRule {
    /// Rule A: single-request cost far above the P90 baseline.
    #[strum(serialize = "A")]
    CostSpike,
    /// Rule B: token volume far above the median baseline.
    #[strum(serialize = "B")]
    TokenExplosion,
    /// Rule C: external retries multiplying a request's effective cost.
    #[strum(serialize = "C")]
    RetryAmplification,
}

/// Severity levels for detected anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum AnomalySeverity {
    Warning,
    Critical,
}

/// A detected anomaly with the values that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyEvent {
    pub feature: String,
    pub model: String,
    pub rule: AnomalyRule,
    pub severity: AnomalySeverity,
    /// The value compared against the threshold. For rule C this is
    /// `cost * retry_count`, not the raw cost.
    pub observed_value: f64,
    /// The baseline statistic the rule was derived from.
    pub baseline_value: f64,
    /// The computed threshold the observed value exceeded.
    pub threshold: f64,
    /// Human-readable explanation.
    pub message: String,
}

/// Detect anomalies in the current event relative to a baseline.
///
/// Returns an empty list immediately for COLD baselines: detection is only
/// defined against a statistically trustworthy sample. Rules evaluate in
/// fixed order A, B, C and accumulate independently; a single event may
/// trigger any subset of them.
pub fn detect_anomalies(
    feature: &str,
    model: &str,
    baseline: &BaselineResult,
    current: &UsageEvent,
) -> Result<Vec<AnomalyEvent>, CostGuardError> {
    if baseline.state == BaselineState::Cold {
        return Ok(Vec::new());
    }
    let Some(metrics) = &baseline.metrics else {
        return Ok(Vec::new());
    };

    if !current.estimated_cost.is_finite() || current.estimated_cost < 0.0 {
        return Err(CostGuardError::InvalidInput(format!(
            "current event has an invalid estimated_cost ({})",
            current.estimated_cost
        )));
    }

    let mut anomalies = Vec::new();

    // Rule A: cost spike (CRITICAL).
    let threshold = metrics.p90_cost * RULE_A_MULTIPLIER;
    if current.estimated_cost > threshold {
        debug!(feature, model, observed = current.estimated_cost, threshold, "rule A fired");
        anomalies.push(AnomalyEvent {
            feature: feature.to_string(),
            model: model.to_string(),
            rule: AnomalyRule::CostSpike,
            severity: AnomalySeverity::Critical,
            observed_value: current.estimated_cost,
            baseline_value: metrics.p90_cost,
            threshold,
            message: format!(
                "Cost spike detected: ${:.2} (P90: ${:.2} * {RULE_A_MULTIPLIER} = ${:.2})",
                current.estimated_cost, metrics.p90_cost, threshold
            ),
        });
    }

    // Rule B: token explosion (WARNING).
    let threshold = metrics.median_tokens as f64 * RULE_B_MULTIPLIER;
    if f64::from(current.total_tokens) > threshold {
        debug!(feature, model, observed = current.total_tokens, threshold, "rule B fired");
        anomalies.push(AnomalyEvent {
            feature: feature.to_string(),
            model: model.to_string(),
            rule: AnomalyRule::TokenExplosion,
            severity: AnomalySeverity::Warning,
            observed_value: f64::from(current.total_tokens),
            baseline_value: metrics.median_tokens as f64,
            threshold,
            message: format!(
                "High token usage: {} (Median: {} * {RULE_B_MULTIPLIER} = {:.0})",
                current.total_tokens, metrics.median_tokens, threshold
            ),
        });
    }

    // Rule C: retry amplification (WARNING).
    if current.retry_count > 1 {
        let threshold = metrics.p90_cost * RULE_C_MULTIPLIER;
        let total_cost = current.estimated_cost * f64::from(current.retry_count);
        if total_cost > threshold {
            debug!(feature, model, observed = total_cost, threshold, "rule C fired");
            anomalies.push(AnomalyEvent {
                feature: feature.to_string(),
                model: model.to_string(),
                rule: AnomalyRule::RetryAmplification,
                severity: AnomalySeverity::Warning,
                observed_value: total_cost,
                baseline_value: metrics.p90_cost,
                threshold,
                message: format!(
                    "Retry amplification: ${:.2} (${:.2} * {} retries) > ${:.2} (P90: ${:.2} * {RULE_C_MULTIPLIER})",
                    total_cost,
                    current.estimated_cost,
                    current.retry_count,
                    threshold,
                    metrics.p90_cost
                ),
            });
        }
    }

    Ok(anomalies)
}
