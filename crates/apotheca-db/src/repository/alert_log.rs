//! # Alert Debounce Log
//!
//! Durable once-per-day debounce for the alert evaluators.
//!
//! The table's primary key is `(entity_id, alert_kind, day)`; a claim is
//! an `INSERT OR IGNORE` against it. The first evaluator run of a UTC
//! calendar day wins the insert and emits the alert; every later run that
//! day loses the insert (zero affected rows) and stays silent. Because
//! the claim is a table write, the debounce survives restarts.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the alert-debounce log.
#[derive(Debug, Clone)]
pub struct AlertLogRepository {
    pool: SqlitePool,
}

impl AlertLogRepository {
    /// Creates a new AlertLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AlertLogRepository { pool }
    }

    /// Claims the right to emit an alert for `(entity_id, alert_kind)`
    /// on `day`. Returns `true` exactly once per key per day.
    pub async fn try_claim(&self, entity_id: &str, alert_kind: &str, day: NaiveDate) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO alert_log (entity_id, alert_kind, day, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(entity_id)
        .bind(alert_kind)
        .bind(day)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() == 1;
        debug!(entity = %entity_id, kind = %alert_kind, %day, claimed, "Alert claim");
        Ok(claimed)
    }

    /// Deletes claims older than `before`. Housekeeping; the table grows
    /// by at most one row per entity per alert kind per day.
    pub async fn prune_before(&self, before: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM alert_log WHERE day < ?1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
