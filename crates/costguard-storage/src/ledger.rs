// SPDX-FileCopyrightText: 2026 Costguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only usage ledger backed by SQLite.
//!
//! Every completed LLM API call is recorded as one immutable row. The
//! ledger exposes filtered reads and aggregate totals for budget
//! derivation, but no update or delete surface — rows are financial
//! ledger entries.
//!
//! All operations go through the single tokio-rusqlite background thread.

use chrono::{DateTime, Duration, Utc};
use costguard_core::{BudgetState, CostGuardError, UsageEvent};
use rusqlite::types::Value;
use tracing::info;

/// Aggregate usage totals over a query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageStats {
    /// Number of recorded calls.
    pub total_requests: u64,
    /// Sum of estimated costs in USD.
    pub total_cost: f64,
    /// Mean estimated cost per call in USD.
    pub avg_cost: f64,
    /// Sum of total tokens.
    pub total_tokens: u64,
}

/// Timestamp text format used in the ledger (sorts lexicographically).
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn parse_ts(text: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Convert a tokio-rusqlite error, recognizing the uninitialized-ledger case.
///
/// SQLite reports a missing table as "no such table"; callers (the
/// simulation harness in particular) treat that condition differently from
/// genuine storage failures.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CostGuardError {
    let text = e.to_string();
    if text.to_ascii_lowercase().contains("no such table") {
        CostGuardError::LedgerMissing(text)
    } else {
        CostGuardError::Storage {
            source: Box::new(e),
        }
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> Result<UsageEvent, rusqlite::Error> {
    let ts_text: String = row.get(0)?;
    Ok(UsageEvent {
        timestamp: parse_ts(&ts_text, 0)?,
        feature: row.get(1)?,
        model: row.get(2)?,
        prompt_tokens: row.get(3)?,
        completion_tokens: row.get(4)?,
        total_tokens: row.get(5)?,
        estimated_cost: row.get(6)?,
        retry_count: row.get(7)?,
        request_id: row.get(8)?,
    })
}

const EVENT_COLUMNS: &str = "timestamp, feature, model, prompt_tokens, completion_tokens, \
     total_tokens, estimated_cost, retry_count, request_id";

/// Persistent append-only ledger of [`UsageEvent`] rows.
pub struct UsageLedger {
    conn: tokio_rusqlite::Connection,
}

impl UsageLedger {
    /// Create a usage ledger using the given tokio-rusqlite connection.
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Open a usage ledger from a database file path.
    pub async fn open(path: &str) -> Result<Self, CostGuardError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CostGuardError::Storage {
                source: Box::new(e),
            })?;
        Ok(Self::new(conn))
    }

    /// Open an in-memory usage ledger (tests and dry runs).
    pub async fn open_in_memory() -> Result<Self, CostGuardError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CostGuardError::Storage {
                source: Box::new(e),
            })?;
        Ok(Self::new(conn))
    }

    /// Create the ledger table and indexes if they do not exist.
    pub async fn initialize(&self) -> Result<(), CostGuardError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS llm_usage_event (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        timestamp TEXT NOT NULL,
                        feature TEXT NOT NULL,
                        model TEXT NOT NULL,
                        prompt_tokens INTEGER NOT NULL,
                        completion_tokens INTEGER NOT NULL,
                        total_tokens INTEGER NOT NULL,
                        estimated_cost REAL NOT NULL,
                        retry_count INTEGER NOT NULL DEFAULT 0,
                        request_id TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_usage_event_feature
                        ON llm_usage_event(feature);
                    CREATE INDEX IF NOT EXISTS idx_usage_event_timestamp
                        ON llm_usage_event(timestamp);
                    CREATE INDEX IF NOT EXISTS idx_usage_event_model
                        ON llm_usage_event(model);",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Append one event to the ledger.
    pub async fn append(&self, event: &UsageEvent) -> Result<(), CostGuardError> {
        let row = event.clone();
        let ts = format_ts(&row.timestamp);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO llm_usage_event (timestamp, feature, model, \
                     prompt_tokens, completion_tokens, total_tokens, estimated_cost, \
                     retry_count, request_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        ts,
                        row.feature,
                        row.model,
                        row.prompt_tokens,
                        row.completion_tokens,
                        row.total_tokens,
                        row.estimated_cost,
                        row.retry_count,
                        row.request_id,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        info!(
            feature = %event.feature,
            model = %event.model,
            total_tokens = event.total_tokens,
            estimated_cost = event.estimated_cost,
            retry_count = event.retry_count,
            "usage event recorded"
        );

        Ok(())
    }

    /// Append many events atomically in one transaction.
    pub async fn append_batch(&self, events: &[UsageEvent]) -> Result<(), CostGuardError> {
        if events.is_empty() {
            return Ok(());
        }
        let rows: Vec<UsageEvent> = events.to_vec();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in &rows {
                    tx.execute(
                        "INSERT INTO llm_usage_event (timestamp, feature, model, \
                         prompt_tokens, completion_tokens, total_tokens, estimated_cost, \
                         retry_count, request_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        rusqlite::params![
                            format_ts(&row.timestamp),
                            row.feature,
                            row.model,
                            row.prompt_tokens,
                            row.completion_tokens,
                            row.total_tokens,
                            row.estimated_cost,
                            row.retry_count,
                            row.request_id,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        info!(count = events.len(), "usage events recorded");
        Ok(())
    }

    /// Fetch recent events, newest first, with optional filters.
    ///
    /// `days` bounds the lookback window relative to now; `limit` caps the
    /// row count. A missing ledger table surfaces as
    /// [`CostGuardError::LedgerMissing`].
    pub async fn recent_events(
        &self,
        feature: Option<&str>,
        model: Option<&str>,
        days: Option<u32>,
        limit: u32,
    ) -> Result<Vec<UsageEvent>, CostGuardError> {
        let mut query = format!("SELECT {EVENT_COLUMNS} FROM llm_usage_event");
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(feature) = feature {
            conditions.push("feature = ?");
            params.push(Value::Text(feature.to_string()));
        }
        if let Some(model) = model {
            conditions.push("model = ?");
            params.push(Value::Text(model.to_string()));
        }
        if let Some(days) = days {
            let cutoff = Utc::now() - Duration::days(i64::from(days));
            conditions.push("timestamp >= ?");
            params.push(Value::Text(format_ts(&cutoff)));
        }

        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY timestamp DESC LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(params), event_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Aggregate totals over the last `days` days, with optional filters.
    pub async fn usage_stats(
        &self,
        feature: Option<&str>,
        model: Option<&str>,
        days: u32,
    ) -> Result<UsageStats, CostGuardError> {
        let cutoff = format_ts(&(Utc::now() - Duration::days(i64::from(days))));
        let mut query = "SELECT COUNT(*), COALESCE(SUM(estimated_cost), 0.0), \
             COALESCE(AVG(estimated_cost), 0.0), COALESCE(SUM(total_tokens), 0) \
             FROM llm_usage_event WHERE timestamp >= ?"
            .to_string();
        let mut params: Vec<Value> = vec![Value::Text(cutoff)];

        if let Some(feature) = feature {
            query.push_str(" AND feature = ?");
            params.push(Value::Text(feature.to_string()));
        }
        if let Some(model) = model {
            query.push_str(" AND model = ?");
            params.push(Value::Text(model.to_string()));
        }

        self.conn
            .call(move |conn| {
                conn.query_row(&query, rusqlite::params_from_iter(params), |row| {
                    Ok(UsageStats {
                        total_requests: row.get::<_, i64>(0)? as u64,
                        total_cost: row.get(1)?,
                        avg_cost: row.get(2)?,
                        total_tokens: row.get::<_, i64>(3)? as u64,
                    })
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Derive the budget position for a feature over an enforcement period.
    ///
    /// The analytical core receives this as caller-supplied input; the
    /// derivation lives here because the ledger owns the period totals.
    pub async fn budget_state(
        &self,
        feature: Option<&str>,
        budget_limit: f64,
        period_days: u32,
    ) -> Result<BudgetState, CostGuardError> {
        let stats = self.usage_stats(feature, None, period_days).await?;
        Ok(BudgetState {
            amount_used: stats.total_cost,
            amount_remaining: budget_limit - stats.total_cost,
            budget_period_days: period_days,
        })
    }
}
