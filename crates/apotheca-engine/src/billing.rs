//! # Billing Service
//!
//! Payment selection and bill settlement.
//!
//! ## Settlement Is One Transaction
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                           │
//! │    for each bill item:  guarded stock deduction                  │
//! │    bill:                PENDING → PAID (compare-and-set)         │
//! │    prescription:        APPROVED → DISPENSED (compare-and-set)   │
//! │  COMMIT                                                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//! Any failure rolls the whole unit back: stock, bill, and prescription
//! either all move or none do. Two clerks collecting the same bill race
//! on the PENDING compare-and-set; exactly one commits.
//!
//! ## Online Payment Ordering
//! The gateway charge runs BEFORE the transaction opens, bounded by a
//! timeout. A declined or timed-out charge changes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use apotheca_core::validation::validate_card_details;
use apotheca_core::{
    lifecycle, Bill, CoreError, PaymentStatus, PaymentType, PickupMethod, PrescriptionStatus,
    ValidationError,
};
use apotheca_db::repository::medicine::DeductOutcome;
use apotheca_db::{BillRepository, Database, MedicineRepository, PrescriptionRepository};

use crate::context::SessionContext;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::events::DomainEvent;
use crate::payment::{ChargeRequest, GatewayError, PaymentGateway};

/// Default upper bound on a gateway round trip.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bill and payment orchestration.
#[derive(Clone)]
pub struct BillingService {
    db: Database,
    dispatcher: NotificationDispatcher,
    gateway: Arc<dyn PaymentGateway>,
    gateway_timeout: Duration,
}

impl BillingService {
    pub fn new(
        db: Database,
        dispatcher: NotificationDispatcher,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        BillingService {
            db,
            dispatcher,
            gateway,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the gateway timeout (tests, slow providers).
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Gets a bill; customers see only their own.
    pub async fn get(&self, ctx: &SessionContext, bill_id: &str) -> EngineResult<Bill> {
        let bill = self.load(bill_id).await?;
        ctx.require_owner_or_staff(&bill.customer_id, "view bill")?;
        Ok(bill)
    }

    /// Chooses (or re-chooses) how the bill will be paid. Legal only
    /// while the bill is PENDING; UNSET is the initial state, not a
    /// selectable choice.
    pub async fn set_payment_type(
        &self,
        ctx: &SessionContext,
        bill_id: &str,
        payment_type: PaymentType,
    ) -> EngineResult<()> {
        if payment_type == PaymentType::Unset {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "payment_type",
                reason: "must be online or pay_on_pickup",
            })
            .into());
        }

        let bill = self.load(bill_id).await?;
        ctx.require_owner_or_staff(&bill.customer_id, "set payment type")?;
        lifecycle::check_bill_pending(bill_id, bill.payment_status, bill.payment_status)?;

        let moved = self.db.bills().set_payment_type(bill_id, payment_type).await?;
        if !moved {
            warn!(id = %bill_id, "Payment type change lost to a concurrent settlement");
            return Err(bill_race_lost(bill_id));
        }

        info!(id = %bill_id, payment_type = payment_type.as_str(), "Payment type set");
        Ok(())
    }

    /// Pays a bill online: charge through the gateway, then settle.
    ///
    /// The charge is bounded by the gateway timeout. Declines and
    /// timeouts surface before any state change.
    pub async fn pay_online(
        &self,
        ctx: &SessionContext,
        bill_id: &str,
        card_number: &str,
        holder_name: &str,
    ) -> EngineResult<Bill> {
        let bill = self.load(bill_id).await?;
        ctx.require_owner_or_staff(&bill.customer_id, "pay online")?;
        lifecycle::check_settlement(
            bill_id,
            bill.payment_status,
            bill.payment_type,
            PaymentType::Online,
        )?;
        validate_card_details(card_number, holder_name).map_err(CoreError::from)?;

        let request = ChargeRequest {
            bill_id: bill.id.clone(),
            bill_number: bill.bill_number.clone(),
            amount_cents: bill.total_cents,
            card_number: card_number.trim().to_string(),
            holder_name: holder_name.trim().to_string(),
        };

        let receipt = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.charge(&request),
        )
        .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(GatewayError::Declined(reason))) => {
                warn!(id = %bill_id, %reason, "Charge declined");
                return Err(EngineError::PaymentDeclined(reason));
            }
            Ok(Err(GatewayError::Unavailable(reason))) => {
                warn!(id = %bill_id, %reason, "Gateway unavailable");
                return Err(EngineError::ExternalService(reason));
            }
            Err(_) => {
                warn!(id = %bill_id, "Gateway call timed out");
                return Err(EngineError::ExternalService(
                    "payment gateway timed out".to_string(),
                ));
            }
        };

        self.settle(&bill, &receipt.transaction_id).await
    }

    /// Collects an in-person payment at pickup and settles the bill.
    ///
    /// The recorded `payment_reference` is the pickup method.
    pub async fn collect_pickup_payment(
        &self,
        ctx: &SessionContext,
        bill_id: &str,
        method: PickupMethod,
    ) -> EngineResult<Bill> {
        ctx.require_staff("collect pickup payment")?;

        let bill = self.load(bill_id).await?;
        lifecycle::check_settlement(
            bill_id,
            bill.payment_status,
            bill.payment_type,
            PaymentType::PayOnPickup,
        )?;

        self.settle(&bill, method.as_str()).await
    }

    /// Cancels a PENDING bill.
    pub async fn cancel(&self, ctx: &SessionContext, bill_id: &str) -> EngineResult<()> {
        let bill = self.load(bill_id).await?;
        ctx.require_owner_or_staff(&bill.customer_id, "cancel bill")?;
        lifecycle::check_bill_pending(bill_id, bill.payment_status, PaymentStatus::Cancelled)?;

        let moved = self.db.bills().cancel(bill_id).await?;
        if !moved {
            return Err(bill_race_lost(bill_id));
        }

        info!(id = %bill_id, "Bill cancelled");
        Ok(())
    }

    /// Expires an overdue PENDING bill (scheduler path, no session).
    ///
    /// Cancels the bill and tells the customer, but only once the bill
    /// is at least `max_age_days` old. A bill that was settled in the
    /// meantime, or one still inside the payment window, is left alone.
    pub async fn mark_expired(&self, bill_id: &str, max_age_days: i64) -> EngineResult<bool> {
        let bill = self.load(bill_id).await?;
        if bill.created_at > Utc::now() - ChronoDuration::days(max_age_days) {
            return Ok(false);
        }

        let moved = self.db.bills().cancel(bill_id).await?;
        if !moved {
            return Ok(false);
        }

        info!(id = %bill_id, bill_number = %bill.bill_number, "Bill expired");

        self.dispatcher
            .dispatch(&DomainEvent::BillExpired {
                bill_id: bill.id.clone(),
                bill_number: bill.bill_number.clone(),
                customer_id: bill.customer_id.clone(),
            })
            .await?;
        Ok(true)
    }

    /// The settlement transaction: stock out, bill PAID, prescription
    /// DISPENSED, all-or-nothing. Dispatches the payment notification
    /// after commit.
    async fn settle(&self, bill: &Bill, payment_reference: &str) -> EngineResult<Bill> {
        let items = self.db.bills().get_items(&bill.id).await?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        for item in &items {
            let outcome =
                MedicineRepository::deduct_in_tx(&mut tx, &item.medicine_id, item.quantity).await?;
            if let DeductOutcome::Insufficient { available } = outcome {
                tx.rollback().await?;
                warn!(
                    bill = %bill.id,
                    medicine = %item.medicine_id,
                    available,
                    requested = item.quantity,
                    "Settlement aborted: insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    medicine_id: item.medicine_id.clone(),
                    available,
                    requested: item.quantity,
                }
                .into());
            }
        }

        let moved = BillRepository::mark_paid_in_tx(&mut tx, &bill.id, payment_reference, now).await?;
        if !moved {
            tx.rollback().await?;
            warn!(id = %bill.id, "Settlement lost to a concurrent payment");
            return Err(bill_race_lost(&bill.id));
        }

        if let Some(prescription_id) = &bill.prescription_id {
            let moved = PrescriptionRepository::transition_in_tx(
                &mut tx,
                prescription_id,
                PrescriptionStatus::Approved,
                PrescriptionStatus::Dispensed,
                None,
            )
            .await?;
            if !moved {
                tx.rollback().await?;
                return Err(CoreError::InvalidStateTransition {
                    entity: "Prescription",
                    id: prescription_id.clone(),
                    from: "concurrently-updated".to_string(),
                    to: PrescriptionStatus::Dispensed.as_str().to_string(),
                }
                .into());
            }
        }

        tx.commit().await?;

        info!(
            id = %bill.id,
            bill_number = %bill.bill_number,
            total_cents = bill.total_cents,
            reference = %payment_reference,
            "Bill settled"
        );

        self.dispatcher
            .dispatch(&DomainEvent::PaymentCollected {
                bill_id: bill.id.clone(),
                bill_number: bill.bill_number.clone(),
                customer_id: bill.customer_id.clone(),
                total: bill.total(),
            })
            .await?;

        self.load(&bill.id).await
    }

    async fn load(&self, bill_id: &str) -> EngineResult<Bill> {
        self.db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Bill", bill_id))
    }
}

/// A bill compare-and-set that failed after the guard passed.
fn bill_race_lost(bill_id: &str) -> EngineError {
    CoreError::InvalidStateTransition {
        entity: "Bill",
        id: bill_id.to_string(),
        from: "concurrently-updated".to_string(),
        to: "paid-or-cancelled".to_string(),
    }
    .into()
}
