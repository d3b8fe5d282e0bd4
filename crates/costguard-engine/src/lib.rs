// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analytical core of the costguard cost-tracking toolkit.
//!
//! This crate provides:
//! - **Pricing**: fixed per-model rate table with round-up cost calculation
//! - **Baseline engine**: windowed median/P90 statistics per feature+model pair
//! - **Anomaly detector**: three fixed threshold rules against a WARM baseline
//! - **Guardrail enforcer**: strict-precedence action resolution
//! - **Simulation harness**: read-only dry-run replay over historical data
//!
//! Everything here is a synchronous pure function over its inputs, except
//! the simulation harness's initial ledger fetch.

pub mod anomaly;
pub mod baseline;
pub mod guardrails;
pub mod pricing;
pub mod simulation;

pub use anomaly::{detect_anomalies, AnomalyEvent, AnomalyRule, AnomalySeverity};
pub use baseline::{
    compute_baseline, exact_percentile, BaselineMetrics, BaselineResult, BaselineState,
};
pub use guardrails::{enforce_guardrails, GuardrailViolation};
pub use pricing::{calculate_cost, pricing_for, ModelPricing};
pub use simulation::{
    simulate_cost_impact, FeatureSimulationResult, SimulationResult, SimulationVerdict,
};
