// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the costguard cost-tracking toolkit.
//!
//! The only entity is the append-only [`UsageLedger`]: one immutable row
//! per completed LLM API call, plus filtered reads and aggregate totals.
//! No update or delete operations are ever exposed.

pub mod ledger;

pub use ledger::{UsageLedger, UsageStats};
