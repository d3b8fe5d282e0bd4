// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./costguard.toml` > `~/.config/costguard/costguard.toml`
//! > `/etc/costguard/costguard.toml` with environment variable overrides via
//! `COSTGUARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CostGuardConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/costguard/costguard.toml` (system-wide)
/// 3. `~/.config/costguard/costguard.toml` (user XDG config)
/// 4. `./costguard.toml` (local directory)
/// 5. `COSTGUARD_*` environment variables
pub fn load_config() -> Result<CostGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CostGuardConfig::default()))
        .merge(Toml::file("/etc/costguard/costguard.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("costguard/costguard.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("costguard.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CostGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CostGuardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CostGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CostGuardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `COSTGUARD_GUARDRAILS_MAX_COST_PER_REQUEST`
/// must map to `guardrails.max_cost_per_request`, not `guardrails.max.cost...`.
fn env_provider() -> Env {
    Env::prefixed("COSTGUARD_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: COSTGUARD_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("guardrails_", "guardrails.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_toml_string() {
        let config = load_config_from_str(
            r#"
[storage]
database_path = "/tmp/ledger.db"

[guardrails]
max_cost_per_request = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.storage.database_path, "/tmp/ledger.db");
        assert_eq!(config.guardrails.max_cost_per_request, Some(0.5));
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.guardrails.budget_limit.is_none());
    }
}
