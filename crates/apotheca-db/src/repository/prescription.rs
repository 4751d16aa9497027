//! # Prescription Repository
//!
//! Database operations for prescriptions and their items.
//!
//! ## Compare-and-Set Status Updates
//! Every status change is written as
//! `UPDATE ... SET status = <to> WHERE id = ? AND status = <from>`.
//! The boolean return (`rows_affected == 1`) tells the engine whether the
//! transition actually happened; a concurrent writer that got there first
//! leaves the loser with `false`, which the engine surfaces as
//! `InvalidStateTransition`.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use apotheca_core::{Prescription, PrescriptionItem, PrescriptionStatus};

const PRESCRIPTION_COLS: &str = "id, customer_id, status, doctor_name, uploaded_at, reviewed_at";

/// Repository for prescription database operations.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRepository { pool }
    }

    /// Gets a prescription by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Prescription>> {
        let prescription = sqlx::query_as::<_, Prescription>(&format!(
            "SELECT {PRESCRIPTION_COLS} FROM prescriptions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prescription)
    }

    /// Inserts a newly uploaded prescription (status PENDING).
    pub async fn insert(&self, prescription: &Prescription) -> DbResult<()> {
        debug!(id = %prescription.id, customer = %prescription.customer_id, "Inserting prescription");

        sqlx::query(
            r#"
            INSERT INTO prescriptions (
                id, customer_id, status, doctor_name, uploaded_at, reviewed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&prescription.id)
        .bind(&prescription.customer_id)
        .bind(prescription.status)
        .bind(&prescription.doctor_name)
        .bind(prescription.uploaded_at)
        .bind(prescription.reviewed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Compare-and-set status transition. Returns whether a row moved.
    pub async fn transition(
        &self,
        id: &str,
        from: PrescriptionStatus,
        to: PrescriptionStatus,
        reviewed_at: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;
        let moved = Self::transition_in_tx(&mut tx, id, from, to, reviewed_at).await?;
        tx.commit().await?;
        Ok(moved)
    }

    /// Transaction-scoped compare-and-set transition, used inside
    /// approval and settlement transactions.
    pub async fn transition_in_tx(
        tx: &mut Transaction<'static, Sqlite>,
        id: &str,
        from: PrescriptionStatus,
        to: PrescriptionStatus,
        reviewed_at: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        debug!(id = %id, from = from.as_str(), to = to.as_str(), "Prescription transition");

        let result = sqlx::query(
            r#"
            UPDATE prescriptions
            SET status = ?3, reviewed_at = COALESCE(?4, reviewed_at)
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(reviewed_at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Inserts prescribed items inside the approval transaction.
    pub async fn insert_items_in_tx(
        tx: &mut Transaction<'static, Sqlite>,
        items: &[PrescriptionItem],
    ) -> DbResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO prescription_items (
                    id, prescription_id, medicine_id, quantity, instructions
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&item.id)
            .bind(&item.prescription_id)
            .bind(&item.medicine_id)
            .bind(item.quantity)
            .bind(&item.instructions)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Gets the prescribed items for a prescription.
    pub async fn get_items(&self, prescription_id: &str) -> DbResult<Vec<PrescriptionItem>> {
        let items = sqlx::query_as::<_, PrescriptionItem>(
            r#"
            SELECT id, prescription_id, medicine_id, quantity, instructions
            FROM prescription_items
            WHERE prescription_id = ?1
            "#,
        )
        .bind(prescription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists prescriptions in a given status, oldest first (review queue order).
    pub async fn list_by_status(&self, status: PrescriptionStatus) -> DbResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(&format!(
            r#"
            SELECT {PRESCRIPTION_COLS} FROM prescriptions
            WHERE status = ?1
            ORDER BY uploaded_at ASC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(prescriptions)
    }

    /// Lists a customer's prescriptions, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(&format!(
            r#"
            SELECT {PRESCRIPTION_COLS} FROM prescriptions
            WHERE customer_id = ?1
            ORDER BY uploaded_at DESC
            "#
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prescriptions)
    }
}

/// Helper to generate a new prescription ID.
pub fn generate_prescription_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn prescription(id: &str, customer: &str) -> Prescription {
        Prescription {
            id: id.to_string(),
            customer_id: customer.to_string(),
            status: PrescriptionStatus::Pending,
            doctor_name: "Dr. Mensah".to_string(),
            uploaded_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[tokio::test]
    async fn test_transition_cas() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.prescriptions();
        repo.insert(&prescription("rx1", "cust-1")).await.unwrap();

        let now = Utc::now();
        let moved = repo
            .transition(
                "rx1",
                PrescriptionStatus::Pending,
                PrescriptionStatus::Approved,
                Some(now),
            )
            .await
            .unwrap();
        assert!(moved);

        // Second attempt from PENDING finds nothing to move.
        let moved = repo
            .transition(
                "rx1",
                PrescriptionStatus::Pending,
                PrescriptionStatus::Rejected,
                Some(now),
            )
            .await
            .unwrap();
        assert!(!moved);

        let rx = repo.get_by_id("rx1").await.unwrap().unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Approved);
        assert!(rx.reviewed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_by_status_queue_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.prescriptions();

        let mut first = prescription("rx-old", "cust-1");
        first.uploaded_at = Utc::now() - chrono::Duration::hours(2);
        repo.insert(&first).await.unwrap();
        repo.insert(&prescription("rx-new", "cust-2")).await.unwrap();

        let queue = repo.list_by_status(PrescriptionStatus::Pending).await.unwrap();
        let ids: Vec<&str> = queue.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["rx-old", "rx-new"]);
    }
}
