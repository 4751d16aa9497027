//! # Medicine Repository (Inventory Ledger)
//!
//! Database operations for medicine stock records.
//!
//! ## Stock Deduction Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  WRONG: read-modify-write (racy, can go negative)                   │
//! │     let m = get(id); if m.quantity >= n { set(m.quantity - n) }     │
//! │                                                                     │
//! │  CORRECT: guarded atomic decrement                                  │
//! │     UPDATE medicines SET quantity = quantity - ?n                   │
//! │     WHERE id = ? AND quantity >= ?n                                 │
//! │                                                                     │
//! │  rows_affected == 0 with an existing row means insufficient stock;  │
//! │  the quantity >= 0 invariant can never be violated.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use apotheca_core::Medicine;

const MEDICINE_COLS: &str =
    "id, name, quantity, reorder_level, unit_price_cents, expiry_date, created_at, updated_at";

/// Outcome of a guarded stock deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductOutcome {
    /// Deduction applied; carries the new quantity.
    Deducted { new_quantity: i64 },
    /// Deduction refused; carries the quantity actually available.
    Insufficient { available: i64 },
}

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MedicineRepository { pool }
    }

    /// Gets a medicine by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as::<_, Medicine>(&format!(
            "SELECT {MEDICINE_COLS} FROM medicines WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(medicine)
    }

    /// Inserts a new medicine record.
    pub async fn insert(&self, medicine: &Medicine) -> DbResult<()> {
        debug!(id = %medicine.id, name = %medicine.name, "Inserting medicine");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, name, quantity, reorder_level, unit_price_cents,
                expiry_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(medicine.quantity)
        .bind(medicine.reorder_level)
        .bind(medicine.unit_price_cents)
        .bind(medicine.expiry_date)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deducts stock with the guarded decrement.
    ///
    /// Returns `Insufficient` (with the available quantity) instead of
    /// applying a partial deduction; `NotFound` if the medicine id does
    /// not exist.
    pub async fn deduct(&self, id: &str, quantity: i64) -> DbResult<DeductOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::deduct_in_tx(&mut tx, id, quantity).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Transaction-scoped guarded deduction, used by bill settlement so
    /// that all line items of a bill deduct (or roll back) together.
    pub async fn deduct_in_tx(
        tx: &mut Transaction<'static, Sqlite>,
        id: &str,
        quantity: i64,
    ) -> DbResult<DeductOutcome> {
        debug!(id = %id, quantity = %quantity, "Deducting stock");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            let new_quantity: i64 =
                sqlx::query_scalar("SELECT quantity FROM medicines WHERE id = ?1")
                    .bind(id)
                    .fetch_one(&mut **tx)
                    .await?;
            return Ok(DeductOutcome::Deducted { new_quantity });
        }

        // Guard refused: distinguish a missing row from a shortfall.
        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM medicines WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

        match available {
            Some(available) => Ok(DeductOutcome::Insufficient { available }),
            None => Err(DbError::not_found("Medicine", id)),
        }
    }

    /// Restocks a medicine (increments quantity).
    ///
    /// Callers validate `quantity >= 0` before reaching this layer.
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<i64> {
        debug!(id = %id, quantity = %quantity, "Restocking");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        let new_quantity: i64 = sqlx::query_scalar("SELECT quantity FROM medicines WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(new_quantity)
    }

    /// Returns all medicines at or below their reorder level, most
    /// urgent (lowest quantity) first.
    pub async fn list_below_reorder(&self) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLS} FROM medicines
            WHERE quantity <= reorder_level
            ORDER BY quantity ASC, name ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    /// Returns medicines whose expiry date falls within `[today, today + days]`,
    /// soonest expiry first. Medicines with no expiry date are excluded.
    pub async fn list_expiring_within(&self, today: NaiveDate, days: i64) -> DbResult<Vec<Medicine>> {
        let cutoff = today + chrono::Duration::days(days);

        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLS} FROM medicines
            WHERE expiry_date IS NOT NULL
              AND expiry_date >= ?1
              AND expiry_date <= ?2
            ORDER BY expiry_date ASC, name ASC
            "#
        ))
        .bind(today)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }

    /// Returns medicines expiring on or before `cutoff`, including
    /// batches that are already past their expiry date.
    ///
    /// Used by the expiry evaluator, which grades already-expired
    /// batches CRITICAL rather than skipping them.
    pub async fn list_expiring_on_or_before(&self, cutoff: NaiveDate) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as::<_, Medicine>(&format!(
            r#"
            SELECT {MEDICINE_COLS} FROM medicines
            WHERE expiry_date IS NOT NULL AND expiry_date <= ?1
            ORDER BY expiry_date ASC, name ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(medicines)
    }
}

/// Helper to generate a new medicine ID.
pub fn generate_medicine_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
