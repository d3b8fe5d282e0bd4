// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types shared across the costguard workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CostGuardError;

/// Token counts for a single LLM API call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt (input) tokens.
    pub prompt_tokens: u32,
    /// Number of completion (output) tokens.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (prompt + completion).
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Immutable record of one LLM API call for financial tracking.
///
/// Append-only events that form an auditable ledger of AI costs. Once
/// written, these records must never be modified or deleted. The store
/// exclusively owns persisted copies; every other component works on
/// read-only value copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// Feature that triggered the call (e.g. "document_summary").
    pub feature: String,
    /// Model identifier used (e.g. "gpt-3.5-turbo").
    pub model: String,
    /// Number of prompt tokens.
    pub prompt_tokens: u32,
    /// Number of completion tokens.
    pub completion_tokens: u32,
    /// Total tokens. Invariant: prompt_tokens + completion_tokens.
    pub total_tokens: u32,
    /// Estimated monetary cost in USD. Invariant: finite and >= 0.
    pub estimated_cost: f64,
    /// Number of retries applied by the external caller.
    pub retry_count: u32,
    /// Provider-assigned request identifier, when known.
    pub request_id: Option<String>,
}

impl UsageEvent {
    /// Create a validated usage event.
    ///
    /// Computes `total_tokens` from the token breakdown and rejects
    /// negative or non-finite costs.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        feature: impl Into<String>,
        model: impl Into<String>,
        usage: TokenUsage,
        estimated_cost: f64,
        retry_count: u32,
        request_id: Option<String>,
    ) -> Result<Self, CostGuardError> {
        let feature = feature.into();
        let model = model.into();
        if feature.trim().is_empty() {
            return Err(CostGuardError::InvalidInput(
                "feature is required and cannot be empty".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(CostGuardError::InvalidInput(
                "model is required and cannot be empty".to_string(),
            ));
        }
        if !estimated_cost.is_finite() || estimated_cost < 0.0 {
            return Err(CostGuardError::InvalidInput(format!(
                "estimated_cost must be finite and non-negative, got {estimated_cost}"
            )));
        }
        Ok(Self {
            timestamp,
            feature,
            model,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total(),
            estimated_cost,
            retry_count,
            request_id,
        })
    }
}

/// Budget position for a feature over an enforcement period.
///
/// Supplied by the caller and derived from the store; the analytical core
/// never computes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Spend accumulated so far in the period, in USD.
    pub amount_used: f64,
    /// Budget remaining, in USD. May be negative once breached.
    pub amount_remaining: f64,
    /// Length of the enforcement period in days.
    pub budget_period_days: u32,
}

impl BudgetState {
    /// A budget state that can never trigger a breach.
    pub fn unlimited(budget_period_days: u32) -> Self {
        Self {
            amount_used: 0.0,
            amount_remaining: f64::INFINITY,
            budget_period_days,
        }
    }
}

/// Enforcement action resolved by the guardrail enforcer.
///
/// The total order by severity is core domain logic (it drives the
/// "maximum wins" resolution), so it is expressed as an explicit rank
/// table rather than relying on variant declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnforcementAction {
    /// Allow the request (no action).
    Allow,
    /// Log a warning but allow the request.
    Warn,
    /// Suggest using a cheaper model.
    Downgrade,
    /// Delay or rate-limit the request.
    Throttle,
    /// Reject the request entirely.
    Block,
}

impl EnforcementAction {
    /// Severity rank: Allow < Warn < Downgrade < Throttle < Block.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Allow => 0,
            Self::Warn => 1,
            Self::Downgrade => 2,
            Self::Throttle => 3,
            Self::Block => 4,
        }
    }

    /// Whether this action must be surfaced as a violation instead of a
    /// return value.
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Throttle | Self::Block)
    }
}

impl PartialOrd for EnforcementAction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnforcementAction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
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
    fn token_usage_total() {
        assert_eq!(usage(1200, 300).total(), 1500);
        assert_eq!(TokenUsage::default().total(), 0);
    }

    #[test]
    fn usage_event_computes_total_tokens() {
        let event = UsageEvent::new(
            Utc::now(),
            "document_summary",
            "gpt-3.5-turbo",
            usage(100, 50),
            0.25,
            0,
            None,
        )
        .unwrap();
        assert_eq!(event.total_tokens, 150);
        assert_eq!(event.retry_count, 0);
        assert!(event.request_id.is_none());
    }

    #[test]
    fn usage_event_rejects_negative_cost() {
        let err = UsageEvent::new(
            Utc::now(),
            "document_summary",
            "gpt-3.5-turbo",
            usage(10, 10),
            -0.01,
            0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CostGuardError::InvalidInput(_)));
    }

    #[test]
    fn usage_event_rejects_nan_cost() {
        let err = UsageEvent::new(
            Utc::now(),
            "document_summary",
            "gpt-3.5-turbo",
            usage(10, 10),
            f64::NAN,
            0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CostGuardError::InvalidInput(_)));
    }

    #[test]
    fn usage_event_rejects_empty_feature_and_model() {
        assert!(
            UsageEvent::new(Utc::now(), "  ", "gpt-4", usage(1, 1), 0.1, 0, None).is_err()
        );
        assert!(
            UsageEvent::new(Utc::now(), "chat", "", usage(1, 1), 0.1, 0, None).is_err()
        );
    }

    #[test]
    fn enforcement_action_total_order() {
        use EnforcementAction::*;
        let mut actions = vec![Block, Allow, Throttle, Warn, Downgrade];
        actions.sort();
        assert_eq!(actions, vec![Allow, Warn, Downgrade, Throttle, Block]);
        assert!(Block > Throttle);
        assert!(Throttle > Downgrade);
        assert!(Downgrade > Warn);
        assert!(Warn > Allow);
    }

    #[test]
    fn enforcement_action_display_and_parse() {
        use std::str::FromStr;
        assert_eq!(EnforcementAction::Block.to_string(), "block");
        assert_eq!(
            EnforcementAction::from_str("throttle").unwrap(),
            EnforcementAction::Throttle
        );
        assert_eq!(
            EnforcementAction::from_str("downgrade").unwrap(),
            EnforcementAction::Downgrade
        );
    }

    #[test]
    fn only_block_and_throttle_are_blocking() {
        assert!(EnforcementAction::Block.is_blocking());
        assert!(EnforcementAction::Throttle.is_blocking());
        assert!(!EnforcementAction::Downgrade.is_blocking());
        assert!(!EnforcementAction::Warn.is_blocking());
        assert!(!EnforcementAction::Allow.is_blocking());
    }

    #[test]
    fn enforcement_action_serde_lowercase() {
        let json = serde_json::to_string(&EnforcementAction::Throttle).unwrap();
        assert_eq!(json, "\"throttle\"");
        let parsed: EnforcementAction = serde_json::from_str("\"block\"").unwrap();
        assert_eq!(parsed, EnforcementAction::Block);
    }
}
