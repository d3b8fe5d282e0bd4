// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost simulation and forecasting.
//!
//! Replays baseline, anomaly, and guardrail logic over historical data to
//! forecast impact without side effects. Simulation mirrors runtime
//! behavior with key differences: read-only, deterministic, and violations
//! are collected as data instead of propagating — it is designed to run
//! unattended (e.g. in CI) without crashing a pipeline.

use costguard_config::GuardrailsConfig;
use costguard_core::{BudgetState, CostGuardError, EnforcementAction, UsageEvent};
use costguard_storage::UsageLedger;
use serde::Serialize;
use strum::Display;
use tracing::info;

use crate::anomaly::{detect_anomalies, AnomalyEvent};
use crate::baseline::{BaselineMetrics, BaselineResult, BaselineState};
use crate::guardrails::enforce_guardrails;

/// Days of history fetched for a simulation run.
const LOOKBACK_DAYS: u32 = 30;

/// Row cap for the history fetch.
const FETCH_LIMIT: u32 = 1000;

/// Minimum group size for a usable simulation baseline.
///
/// Deliberately lower than the live engine's threshold of 20 so small
/// historical samples still produce a forecast.
const SIMULATION_WARM_THRESHOLD: usize = 3;

/// Final verdict of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SimulationVerdict {
    Pass,
    Warn,
    Fail,
}

/// Results of simulating a single feature+model group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSimulationResult {
    pub feature: String,
    pub model: String,
    /// Run-rate estimate: the 30-day cost sum treated as a monthly figure.
    pub estimated_monthly_cost: f64,
    pub anomalies: Vec<AnomalyEvent>,
    /// Enforcement outcomes recorded instead of raised.
    pub violations: Vec<(EnforcementAction, String)>,
}

/// Results of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub per_feature_results: Vec<FeatureSimulationResult>,
    pub overall_verdict: SimulationVerdict,
    pub estimated_monthly_impact: f64,
}

impl SimulationResult {
    fn empty() -> Self {
        Self {
            per_feature_results: Vec::new(),
            overall_verdict: SimulationVerdict::Pass,
            estimated_monthly_impact: 0.0,
        }
    }
}

/// Simulate cost impact of current usage patterns against guardrails.
///
/// Read-only and deterministic: identical stored data yields identical
/// results. An uninitialized ledger or an empty history is a trivial PASS,
/// not an error; any other storage failure propagates.
pub async fn simulate_cost_impact(
    feature: Option<&str>,
    config: &GuardrailsConfig,
    ledger: &UsageLedger,
) -> Result<SimulationResult, CostGuardError> {
    let events = match ledger
        .recent_events(feature, None, Some(LOOKBACK_DAYS), FETCH_LIMIT)
        .await
    {
        Ok(events) => events,
        Err(CostGuardError::LedgerMissing(_)) => return Ok(SimulationResult::empty()),
        Err(e) => return Err(e),
    };

    if events.is_empty() {
        return Ok(SimulationResult::empty());
    }

    // Group events by (feature, model), preserving encounter order.
    let mut groups: Vec<((String, String), Vec<UsageEvent>)> = Vec::new();
    for event in events {
        let key = (event.feature.clone(), event.model.clone());
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, list)) => list.push(event),
            None => groups.push((key, vec![event])),
        }
    }

    let mut results = Vec::new();
    for ((feature_name, model), group_events) in groups {
        // The most-recently-inserted event stands in for "current".
        let Some(current) = group_events
            .iter()
            .max_by_key(|e| e.timestamp)
            .cloned()
        else {
            continue;
        };

        let Some(baseline) = group_baseline(&group_events) else {
            continue;
        };

        let anomalies = if baseline.state == BaselineState::Warm {
            detect_anomalies(&feature_name, &model, &baseline, &current)?
        } else {
            Vec::new()
        };

        let violations =
            simulate_enforcement(&feature_name, &model, config, &baseline, &current, &anomalies);

        let total: f64 = group_events.iter().map(|e| e.estimated_cost).sum();
        let daily_avg = total / f64::from(LOOKBACK_DAYS);
        let estimated_monthly = daily_avg * 30.0;

        results.push(FeatureSimulationResult {
            feature: feature_name,
            model,
            estimated_monthly_cost: estimated_monthly,
            anomalies,
            violations,
        });
    }

    let overall_verdict = determine_overall_verdict(&results);
    let estimated_monthly_impact: f64 =
        results.iter().map(|r| r.estimated_monthly_cost).sum();

    info!(
        groups = results.len(),
        verdict = %overall_verdict,
        estimated_monthly_impact,
        "simulation complete"
    );

    Ok(SimulationResult {
        per_feature_results: results,
        overall_verdict,
        estimated_monthly_impact,
    })
}

/// Build a baseline from one group's historical events.
///
/// This is deliberately NOT the live engine's `compute_baseline`: it uses a
/// lower WARM threshold (>= 3 events vs >= 20) and plain sorted-index
/// percentiles with no interpolation and no time/volume window, so small
/// samples still produce a usable forecast. Simulation numbers are
/// therefore not expected to match live baseline computation exactly.
fn group_baseline(events: &[UsageEvent]) -> Option<BaselineResult> {
    let first = events.first()?;
    let mut window_start = first.timestamp;
    let mut window_end = first.timestamp;
    for event in events {
        window_start = window_start.min(event.timestamp);
        window_end = window_end.max(event.timestamp);
    }

    if events.len() < SIMULATION_WARM_THRESHOLD {
        return Some(BaselineResult {
            metrics: None,
            state: BaselineState::Cold,
            window_start,
            window_end,
        });
    }

    let mut costs: Vec<f64> = events.iter().map(|e| e.estimated_cost).collect();
    costs.sort_by(f64::total_cmp);
    let mut tokens: Vec<u32> = events.iter().map(|e| e.total_tokens).collect();
    tokens.sort_unstable();

    let n = costs.len();
    Some(BaselineResult {
        metrics: Some(BaselineMetrics {
            median_cost: costs[n / 2],
            p90_cost: costs[(n as f64 * 0.9) as usize],
            median_tokens: u64::from(tokens[n / 2]),
            sample_count: n,
        }),
        state: BaselineState::Warm,
        window_start,
        window_end,
    })
}

/// Run guardrail enforcement in dry-run mode, collecting outcomes.
///
/// The budget state is unlimited so only the per-request ceiling and
/// anomaly signals can fire. COLD groups are skipped entirely.
fn simulate_enforcement(
    feature: &str,
    model: &str,
    config: &GuardrailsConfig,
    baseline: &BaselineResult,
    current: &UsageEvent,
    anomalies: &[AnomalyEvent],
) -> Vec<(EnforcementAction, String)> {
    if baseline.state == BaselineState::Cold {
        return Vec::new();
    }

    let budget_state = BudgetState::unlimited(LOOKBACK_DAYS);
    match enforce_guardrails(
        feature,
        model,
        config,
        baseline,
        current,
        anomalies,
        &budget_state,
    ) {
        Ok(EnforcementAction::Allow) => Vec::new(),
        Ok(action) => vec![(action, format!("Simulated {action}"))],
        Err(violation) => vec![(violation.action, violation.message)],
    }
}

/// Fold per-group violations into the overall verdict.
fn determine_overall_verdict(results: &[FeatureSimulationResult]) -> SimulationVerdict {
    let mut has_blocking = false;
    let mut has_warnings = false;

    for result in results {
        for (action, _) in &result.violations {
            if action.is_blocking() {
                has_blocking = true;
            } else if *action == EnforcementAction::Warn {
                has_warnings = true;
            }
        }
    }

    if has_blocking {
        SimulationVerdict::Fail
    } else if has_warnings {
        SimulationVerdict::Warn
    } else {
        SimulationVerdict::Pass
    }
}
