// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for costguard.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use costguard_core::EnforcementAction;
use serde::{Deserialize, Serialize};

/// Top-level costguard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostGuardConfig {
    /// Usage ledger storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Guardrail enforcement settings.
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
}

/// Usage ledger storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file holding the usage ledger.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("costguard").join("costguard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("costguard.db"))
        .to_string_lossy()
        .into_owned()
}

/// Guardrail enforcement configuration.
///
/// `max_cost_per_request` and `budget_limit` are unlimited when unset.
/// Breach actions accept `allow`, `warn`, `downgrade`, `throttle`, `block`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailsConfig {
    /// Hard ceiling on a single request's estimated cost in USD.
    #[serde(default)]
    pub max_cost_per_request: Option<f64>,

    /// Spending budget in USD for the enforcement period.
    #[serde(default)]
    pub budget_limit: Option<f64>,

    /// Action taken when the budget is exhausted.
    #[serde(default = "default_on_budget_breach")]
    pub on_budget_breach: EnforcementAction,

    /// Action taken for a critical anomaly.
    #[serde(default = "default_on_critical_anomaly")]
    pub on_critical_anomaly: EnforcementAction,

    /// Action taken for a warning anomaly.
    #[serde(default = "default_on_warning_anomaly")]
    pub on_warning_anomaly: EnforcementAction,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            max_cost_per_request: None,
            budget_limit: None,
            on_budget_breach: default_on_budget_breach(),
            on_critical_anomaly: default_on_critical_anomaly(),
            on_warning_anomaly: default_on_warning_anomaly(),
        }
    }
}

fn default_on_budget_breach() -> EnforcementAction {
    EnforcementAction::Block
}

fn default_on_critical_anomaly() -> EnforcementAction {
    EnforcementAction::Block
}

fn default_on_warning_anomaly() -> EnforcementAction {
    EnforcementAction::Warn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unlimited_with_block_breach() {
        let config = CostGuardConfig::default();
        assert!(config.guardrails.max_cost_per_request.is_none());
        assert!(config.guardrails.budget_limit.is_none());
        assert_eq!(config.guardrails.on_budget_breach, EnforcementAction::Block);
        assert_eq!(
            config.guardrails.on_critical_anomaly,
            EnforcementAction::Block
        );
        assert_eq!(config.guardrails.on_warning_anomaly, EnforcementAction::Warn);
        assert!(!config.storage.database_path.is_empty());
    }

    #[test]
    fn guardrails_section_deserializes_actions() {
        let toml_str = r#"
[guardrails]
max_cost_per_request = 1.5
budget_limit = 200.0
on_budget_breach = "throttle"
on_warning_anomaly = "downgrade"
"#;
        let config: CostGuardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.guardrails.max_cost_per_request, Some(1.5));
        assert_eq!(config.guardrails.budget_limit, Some(200.0));
        assert_eq!(
            config.guardrails.on_budget_breach,
            EnforcementAction::Throttle
        );
        // Unspecified actions keep their defaults.
        assert_eq!(
            config.guardrails.on_critical_anomaly,
            EnforcementAction::Block
        );
        assert_eq!(
            config.guardrails.on_warning_anomaly,
            EnforcementAction::Downgrade
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[guardrails]
max_cost_per_requst = 1.0
"#;
        assert!(toml::from_str::<CostGuardConfig>(toml_str).is_err());
    }

    #[test]
    fn invalid_action_name_is_rejected() {
        let toml_str = r#"
[guardrails]
on_budget_breach = "explode"
"#;
        assert!(toml::from_str::<CostGuardConfig>(toml_str).is_err());
    }
}
