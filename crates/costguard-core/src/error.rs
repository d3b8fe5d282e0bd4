// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the costguard cost-tracking toolkit.

use thiserror::Error;

/// The primary error type used across costguard's core operations.
#[derive(Debug, Error)]
pub enum CostGuardError {
    /// Input validation errors (empty event lists, missing or malformed
    /// fields, percentile out of range). These fail fast and never default.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors (invalid TOML, out-of-range limits).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The usage ledger table does not exist yet.
    ///
    /// Kept separate from `Storage` so the simulation harness can map an
    /// uninitialized database to an empty PASS result instead of failing.
    #[error("usage ledger not initialized: {0}")]
    LedgerMissing(String),

    /// Internal invariant violations that should be unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}
