//! # Alert Evaluator
//!
//! Periodic scans over the ledger and the bill book:
//!
//! - low stock: `quantity <= reorder_level`
//! - expiring batches: expiry within the horizon, or already past
//! - overdue bills: PENDING older than the maximum age
//!
//! ## Debounce
//! Each emission first claims `(entity_id, alert_kind, utc_day)` in the
//! durable alert log. Running an evaluator twice in one day emits each
//! alert once; the debounce survives restarts because it is a table
//! write, not memory. An entity that leaves the alerting condition and
//! re-enters it on a later day alerts again.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use apotheca_core::{Notification, DEFAULT_BILL_MAX_AGE_DAYS, DEFAULT_EXPIRY_HORIZON_DAYS};
use apotheca_db::Database;

use crate::billing::BillingService;
use crate::dispatcher::NotificationDispatcher;
use crate::error::EngineResult;
use crate::events::DomainEvent;

/// Scans aggregates and emits debounced alerts.
#[derive(Clone)]
pub struct AlertEvaluator {
    db: Database,
    dispatcher: NotificationDispatcher,
    billing: BillingService,
}

impl AlertEvaluator {
    pub fn new(db: Database, dispatcher: NotificationDispatcher, billing: BillingService) -> Self {
        AlertEvaluator {
            db,
            dispatcher,
            billing,
        }
    }

    /// Emits LOW_STOCK alerts for every medicine at or below its reorder
    /// level, at most once per medicine per UTC day. Stock-outs are
    /// graded HIGH, the rest MEDIUM. Returns the created notifications.
    pub async fn evaluate_low_stock(&self) -> EngineResult<Vec<Notification>> {
        let today = Utc::now().date_naive();
        let low = self.db.medicines().list_below_reorder().await?;
        debug!(candidates = low.len(), "Low-stock scan");

        let alert_log = self.db.alert_log();
        let mut created = Vec::new();
        for medicine in low {
            if !alert_log.try_claim(&medicine.id, "low_stock", today).await? {
                continue;
            }
            let mut batch = self
                .dispatcher
                .dispatch(&DomainEvent::LowStock {
                    medicine_id: medicine.id.clone(),
                    name: medicine.name.clone(),
                    quantity: medicine.quantity,
                    reorder_level: medicine.reorder_level,
                })
                .await?;
            created.append(&mut batch);
        }

        if !created.is_empty() {
            info!(count = created.len(), "Low-stock alerts emitted");
        }
        Ok(created)
    }

    /// Emits EXPIRY_ALERT for batches expiring within `horizon_days`,
    /// including batches already past their date (graded CRITICAL).
    pub async fn evaluate_expiry(&self, horizon_days: i64) -> EngineResult<Vec<Notification>> {
        let today = Utc::now().date_naive();
        let cutoff = today + Duration::days(horizon_days);
        let expiring = self.db.medicines().list_expiring_on_or_before(cutoff).await?;
        debug!(candidates = expiring.len(), horizon_days, "Expiry scan");

        let alert_log = self.db.alert_log();
        let mut created = Vec::new();
        for medicine in expiring {
            let Some(expiry_date) = medicine.expiry_date else {
                continue;
            };
            if !alert_log.try_claim(&medicine.id, "expiry_alert", today).await? {
                continue;
            }
            let mut batch = self
                .dispatcher
                .dispatch(&DomainEvent::ExpiringBatch {
                    medicine_id: medicine.id.clone(),
                    name: medicine.name.clone(),
                    expiry_date,
                    expired: medicine.is_expired(today),
                })
                .await?;
            created.append(&mut batch);
        }

        if !created.is_empty() {
            info!(count = created.len(), "Expiry alerts emitted");
        }
        Ok(created)
    }

    /// Expires PENDING bills older than `max_age_days`: each overdue
    /// bill is cancelled (once, via the debounce claim) and its customer
    /// notified. Returns the ids of bills actually expired.
    pub async fn evaluate_overdue_bills(&self, max_age_days: i64) -> EngineResult<Vec<String>> {
        let today = Utc::now().date_naive();
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let overdue = self.db.bills().list_pending_older_than(cutoff).await?;
        debug!(candidates = overdue.len(), max_age_days, "Overdue-bill scan");

        let alert_log = self.db.alert_log();
        let mut expired = Vec::new();
        for bill in overdue {
            if !alert_log.try_claim(&bill.id, "overdue_bill", today).await? {
                continue;
            }
            if self.billing.mark_expired(&bill.id, max_age_days).await? {
                expired.push(bill.id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Overdue bills expired");
        }
        Ok(expired)
    }

    /// Runs all evaluators with the default horizon and bill age.
    pub async fn run_all(&self) -> EngineResult<()> {
        self.evaluate_low_stock().await?;
        self.evaluate_expiry(DEFAULT_EXPIRY_HORIZON_DAYS).await?;
        self.evaluate_overdue_bills(DEFAULT_BILL_MAX_AGE_DAYS).await?;
        Ok(())
    }
}
