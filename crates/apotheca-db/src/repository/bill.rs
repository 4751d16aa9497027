//! # Bill Repository
//!
//! Database operations for bills and bill items.
//!
//! ## Bill Lifecycle
//! ```text
//! 1. CREATE        insert_with_items_in_tx() inside the approval
//!                  transaction → Bill { payment_status: Pending }
//! 2. CHOOSE TYPE   set_payment_type() — repeatable while Pending
//! 3. SETTLE        mark_paid_in_tx() inside the settlement transaction,
//!                  together with stock deduction and dispensation
//! 4. (OR) CANCEL   cancel() / expiry cancellation — terminal
//! ```
//!
//! All status writes are compare-and-set on `payment_status = 'pending'`;
//! a concurrent settlement loser observes zero affected rows.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use apotheca_core::{Bill, BillItem, PaymentType};

const BILL_COLS: &str = "id, prescription_id, customer_id, bill_number, subtotal_cents, \
     discount_cents, tax_cents, total_cents, payment_type, payment_status, \
     payment_reference, created_at, paid_at";

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLS} FROM bills WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets the bill linked to a prescription, if any.
    pub async fn get_by_prescription(&self, prescription_id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLS} FROM bills WHERE prescription_id = ?1"
        ))
        .bind(prescription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Inserts a bill and its line items inside the approval transaction.
    ///
    /// ## Snapshot Pattern
    /// Item rows carry the medicine name and unit price frozen at billing
    /// time, so later catalog edits don't rewrite history.
    pub async fn insert_with_items_in_tx(
        tx: &mut Transaction<'static, Sqlite>,
        bill: &Bill,
        items: &[BillItem],
    ) -> DbResult<()> {
        debug!(id = %bill.id, bill_number = %bill.bill_number, items = items.len(), "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, prescription_id, customer_id, bill_number,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_type, payment_status, payment_reference,
                created_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.prescription_id)
        .bind(&bill.customer_id)
        .bind(&bill.bill_number)
        .bind(bill.subtotal_cents)
        .bind(bill.discount_cents)
        .bind(bill.tax_cents)
        .bind(bill.total_cents)
        .bind(bill.payment_type)
        .bind(bill.payment_status)
        .bind(&bill.payment_reference)
        .bind(bill.created_at)
        .bind(bill.paid_at)
        .execute(&mut **tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, medicine_id, name_snapshot,
                    unit_price_cents, quantity, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.bill_id)
            .bind(&item.medicine_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Gets all items for a bill.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, medicine_id, name_snapshot,
                   unit_price_cents, quantity, total_cents, created_at
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sets the payment type. Legal (and repeatable) only while PENDING;
    /// returns whether a row moved.
    pub async fn set_payment_type(&self, id: &str, payment_type: PaymentType) -> DbResult<bool> {
        debug!(id = %id, payment_type = payment_type.as_str(), "Setting payment type");

        let result = sqlx::query(
            r#"
            UPDATE bills SET payment_type = ?2
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(payment_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks a bill PAID inside the settlement transaction.
    ///
    /// Compare-and-set on PENDING: exactly one of two concurrent
    /// settlements can succeed. `payment_reference` records the gateway
    /// transaction id or the pickup method.
    pub async fn mark_paid_in_tx(
        tx: &mut Transaction<'static, Sqlite>,
        id: &str,
        payment_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bills
            SET payment_status = 'paid', payment_reference = ?2, paid_at = ?3
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(payment_reference)
        .bind(paid_at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Cancels a PENDING bill. Returns whether a row moved.
    pub async fn cancel(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Cancelling bill");

        let result = sqlx::query(
            r#"
            UPDATE bills SET payment_status = 'cancelled'
            WHERE id = ?1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lists PENDING bills created at or before `cutoff`, oldest first.
    /// Feed for the overdue-bill evaluator and expiry cancellation.
    pub async fn list_pending_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLS} FROM bills
            WHERE payment_status = 'pending' AND created_at <= ?1
            ORDER BY created_at ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }
}

/// Generates a bill number in format: RX-YYYYMMDD-NNNN
///
/// The date makes numbers sortable at a glance; the trailing sequence
/// disambiguates bills created the same day.
pub fn generate_bill_number(now: DateTime<Utc>) -> String {
    let seq = (now.timestamp_millis() % 10000) as u32;
    format!("RX-{}-{:04}", now.format("%Y%m%d"), seq)
}

/// Helper to generate a new bill ID.
pub fn generate_bill_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new bill item ID.
pub fn generate_bill_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use apotheca_core::PaymentStatus;

    fn bill(id: &str) -> Bill {
        let now = Utc::now();
        Bill {
            id: id.to_string(),
            prescription_id: None,
            customer_id: "cust-1".to_string(),
            bill_number: format!("RX-20260824-{id}"),
            subtotal_cents: 3500,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 3500,
            payment_type: PaymentType::Unset,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            created_at: now,
            paid_at: None,
        }
    }

    async fn insert_bill(db: &Database, b: &Bill) {
        let mut tx = db.begin().await.unwrap();
        BillRepository::insert_with_items_in_tx(&mut tx, b, &[]).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_type_reselection_while_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_bill(&db, &bill("b1")).await;
        let repo = db.bills();

        assert!(repo.set_payment_type("b1", PaymentType::Online).await.unwrap());
        assert!(repo.set_payment_type("b1", PaymentType::PayOnPickup).await.unwrap());

        let stored = repo.get_by_id("b1").await.unwrap().unwrap();
        assert_eq!(stored.payment_type, PaymentType::PayOnPickup);
    }

    #[tokio::test]
    async fn test_mark_paid_cas_is_single_shot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert_bill(&db, &bill("b1")).await;

        let now = Utc::now();
        let mut tx = db.begin().await.unwrap();
        assert!(BillRepository::mark_paid_in_tx(&mut tx, "b1", "txn-1", now).await.unwrap());
        tx.commit().await.unwrap();

        // Already PAID: the CAS refuses, as does any later type change.
        let mut tx = db.begin().await.unwrap();
        assert!(!BillRepository::mark_paid_in_tx(&mut tx, "b1", "txn-2", now).await.unwrap());
        tx.commit().await.unwrap();
        assert!(!db.bills().set_payment_type("b1", PaymentType::Online).await.unwrap());

        let stored = db.bills().get_by_id("b1").await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.payment_reference.as_deref(), Some("txn-1"));
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_pending_older_than() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut stale = bill("stale");
        stale.created_at = Utc::now() - chrono::Duration::days(10);
        let fresh = bill("fresh");
        insert_bill(&db, &stale).await;
        insert_bill(&db, &fresh).await;

        let cutoff = Utc::now() - chrono::Duration::days(7);
        let overdue = db.bills().list_pending_older_than(cutoff).await.unwrap();
        let ids: Vec<&str> = overdue.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["stale"]);
    }
}
