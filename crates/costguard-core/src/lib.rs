// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the costguard cost-tracking toolkit.
//!
//! This crate provides the error type and the shared domain types used
//! throughout the costguard workspace: the immutable [`UsageEvent`]
//! ledger entry, [`TokenUsage`] breakdowns, and the severity-ordered
//! [`EnforcementAction`].

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CostGuardError;
pub use types::{BudgetState, EnforcementAction, TokenUsage, UsageEvent};
