//! # Prescription Service
//!
//! Orchestrates the prescription lifecycle:
//! ```text
//! upload (customer) ──► PENDING ──approve──► APPROVED ──settle──► DISPENSED ──complete──► COMPLETED
//!                          │
//!                          └──reject──► REJECTED
//! ```
//!
//! ## Approval Is Atomic
//! `approve` writes the status flip, the prescribed items, and the
//! generated bill (with price/name snapshots) in ONE transaction. A
//! reviewer racing another reviewer loses the compare-and-set and gets
//! `InvalidStateTransition`; the loser's transaction rolls back whole.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use apotheca_core::billing::{compute_bill, LineInput};
use apotheca_core::validation::{validate_name, validate_quantity};
use apotheca_core::{
    lifecycle, Bill, BillItem, CoreError, Money, PaymentStatus, PaymentType, Prescription,
    PrescriptionItem, PrescriptionStatus, MAX_PRESCRIPTION_ITEMS,
};
use apotheca_db::repository::bill::{generate_bill_id, generate_bill_item_id, generate_bill_number};
use apotheca_db::repository::prescription::generate_prescription_id;
use apotheca_db::{BillRepository, Database, PrescriptionRepository};

use crate::context::SessionContext;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::events::DomainEvent;

/// One approved line: the pharmacist confirms medicine and quantity
/// against the uploaded prescription.
#[derive(Debug, Clone)]
pub struct ApprovedItem {
    pub medicine_id: String,
    pub quantity: i64,
    pub instructions: Option<String>,
}

/// Prescription lifecycle orchestration.
#[derive(Debug, Clone)]
pub struct PrescriptionService {
    db: Database,
    dispatcher: NotificationDispatcher,
}

impl PrescriptionService {
    pub fn new(db: Database, dispatcher: NotificationDispatcher) -> Self {
        PrescriptionService { db, dispatcher }
    }

    /// Uploads a new prescription for the calling customer and notifies
    /// staff that a review is waiting.
    pub async fn upload(
        &self,
        ctx: &SessionContext,
        doctor_name: &str,
    ) -> EngineResult<Prescription> {
        validate_name("doctor_name", doctor_name).map_err(CoreError::from)?;

        let prescription = Prescription {
            id: generate_prescription_id(),
            customer_id: ctx.user_id.clone(),
            status: PrescriptionStatus::Pending,
            doctor_name: doctor_name.trim().to_string(),
            uploaded_at: Utc::now(),
            reviewed_at: None,
        };
        self.db.prescriptions().insert(&prescription).await?;

        info!(id = %prescription.id, customer = %ctx.user_id, "Prescription uploaded");

        self.dispatcher
            .dispatch(&DomainEvent::PrescriptionUploaded {
                prescription_id: prescription.id.clone(),
                customer_id: prescription.customer_id.clone(),
                doctor_name: prescription.doctor_name.clone(),
            })
            .await?;

        Ok(prescription)
    }

    /// Approves a PENDING prescription and generates its bill.
    ///
    /// ## What Happens (one transaction)
    /// 1. Status PENDING → APPROVED (compare-and-set)
    /// 2. Prescribed items recorded
    /// 3. Bill created with name/price snapshots and denormalized totals
    ///
    /// Then PRESCRIPTION_APPROVED and BILL_GENERATED are dispatched to
    /// the customer.
    pub async fn approve(
        &self,
        ctx: &SessionContext,
        prescription_id: &str,
        items: &[ApprovedItem],
        discount: Money,
        tax: Money,
    ) -> EngineResult<Bill> {
        ctx.require_staff("approve")?;

        let prescription = self.load(prescription_id).await?;
        lifecycle::check_prescription_transition(
            prescription_id,
            prescription.status,
            PrescriptionStatus::Approved,
        )?;

        if items.len() > MAX_PRESCRIPTION_ITEMS {
            return Err(CoreError::InvalidQuantity {
                requested: items.len() as i64,
            }
            .into());
        }

        // Snapshot current catalog data into bill lines.
        let medicines = self.db.medicines();
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            validate_quantity("quantity", item.quantity).map_err(CoreError::from)?;
            let medicine = medicines
                .get_by_id(&item.medicine_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Medicine", &item.medicine_id))?;
            let unit_price = medicine.unit_price();
            lines.push(LineInput {
                medicine_id: medicine.id,
                name: medicine.name,
                unit_price,
                quantity: item.quantity,
            });
        }
        let (computed, totals) = compute_bill(&lines, discount, tax)?;

        let now = Utc::now();
        let bill_id = generate_bill_id();
        let bill = Bill {
            id: bill_id.clone(),
            prescription_id: Some(prescription_id.to_string()),
            customer_id: prescription.customer_id.clone(),
            bill_number: generate_bill_number(now),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            payment_type: PaymentType::Unset,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            created_at: now,
            paid_at: None,
        };
        let bill_items: Vec<BillItem> = computed
            .iter()
            .map(|line| BillItem {
                id: generate_bill_item_id(),
                bill_id: bill_id.clone(),
                medicine_id: line.medicine_id.clone(),
                name_snapshot: line.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                total_cents: line.total.cents(),
                created_at: now,
            })
            .collect();
        let prescription_items: Vec<PrescriptionItem> = items
            .iter()
            .map(|item| PrescriptionItem {
                id: Uuid::new_v4().to_string(),
                prescription_id: prescription_id.to_string(),
                medicine_id: item.medicine_id.clone(),
                quantity: item.quantity,
                instructions: item.instructions.clone(),
            })
            .collect();

        let mut tx = self.db.begin().await?;
        let moved = PrescriptionRepository::transition_in_tx(
            &mut tx,
            prescription_id,
            PrescriptionStatus::Pending,
            PrescriptionStatus::Approved,
            Some(now),
        )
        .await?;
        if !moved {
            tx.rollback().await?;
            warn!(id = %prescription_id, "Approval lost a concurrent review");
            return Err(race_lost(prescription_id, PrescriptionStatus::Approved));
        }
        PrescriptionRepository::insert_items_in_tx(&mut tx, &prescription_items).await?;
        BillRepository::insert_with_items_in_tx(&mut tx, &bill, &bill_items).await?;
        tx.commit().await?;

        info!(
            id = %prescription_id,
            bill = %bill.bill_number,
            total_cents = bill.total_cents,
            reviewer = %ctx.user_id,
            "Prescription approved"
        );

        self.dispatcher
            .dispatch(&DomainEvent::PrescriptionApproved {
                prescription_id: prescription_id.to_string(),
                customer_id: prescription.customer_id.clone(),
                bill_number: bill.bill_number.clone(),
                total: bill.total(),
            })
            .await?;
        self.dispatcher
            .dispatch(&DomainEvent::BillGenerated {
                bill_id: bill.id.clone(),
                bill_number: bill.bill_number.clone(),
                customer_id: prescription.customer_id,
                total: bill.total(),
            })
            .await?;

        Ok(bill)
    }

    /// Rejects a PENDING prescription with a reason the customer sees.
    pub async fn reject(
        &self,
        ctx: &SessionContext,
        prescription_id: &str,
        reason: &str,
    ) -> EngineResult<()> {
        ctx.require_staff("reject")?;
        validate_name("reason", reason).map_err(CoreError::from)?;

        let prescription = self.load(prescription_id).await?;
        lifecycle::check_prescription_transition(
            prescription_id,
            prescription.status,
            PrescriptionStatus::Rejected,
        )?;

        let moved = self
            .db
            .prescriptions()
            .transition(
                prescription_id,
                PrescriptionStatus::Pending,
                PrescriptionStatus::Rejected,
                Some(Utc::now()),
            )
            .await?;
        if !moved {
            warn!(id = %prescription_id, "Rejection lost a concurrent review");
            return Err(race_lost(prescription_id, PrescriptionStatus::Rejected));
        }

        info!(id = %prescription_id, reviewer = %ctx.user_id, "Prescription rejected");

        self.dispatcher
            .dispatch(&DomainEvent::PrescriptionRejected {
                prescription_id: prescription_id.to_string(),
                customer_id: prescription.customer_id,
                reason: reason.trim().to_string(),
            })
            .await?;

        Ok(())
    }

    /// Dispenses an APPROVED prescription whose bill is already PAID.
    ///
    /// Pickup settlement dispenses inside its own transaction; this
    /// standalone path covers handoff after online prepayment.
    pub async fn dispense(&self, ctx: &SessionContext, prescription_id: &str) -> EngineResult<()> {
        ctx.require_staff("dispense")?;

        let prescription = self.load(prescription_id).await?;
        let bill = self
            .db
            .bills()
            .get_by_prescription(prescription_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Bill", prescription_id))?;
        lifecycle::check_dispensation(prescription_id, prescription.status, bill.payment_status)?;

        let moved = self
            .db
            .prescriptions()
            .transition(
                prescription_id,
                PrescriptionStatus::Approved,
                PrescriptionStatus::Dispensed,
                None,
            )
            .await?;
        if !moved {
            return Err(race_lost(prescription_id, PrescriptionStatus::Dispensed));
        }

        info!(id = %prescription_id, by = %ctx.user_id, "Prescription dispensed");
        Ok(())
    }

    /// Closes a DISPENSED prescription.
    pub async fn complete(&self, ctx: &SessionContext, prescription_id: &str) -> EngineResult<()> {
        ctx.require_staff("complete")?;

        let prescription = self.load(prescription_id).await?;
        lifecycle::check_prescription_transition(
            prescription_id,
            prescription.status,
            PrescriptionStatus::Completed,
        )?;

        let moved = self
            .db
            .prescriptions()
            .transition(
                prescription_id,
                PrescriptionStatus::Dispensed,
                PrescriptionStatus::Completed,
                None,
            )
            .await?;
        if !moved {
            return Err(race_lost(prescription_id, PrescriptionStatus::Completed));
        }

        info!(id = %prescription_id, "Prescription completed");
        Ok(())
    }

    /// Gets a prescription; customers see only their own.
    pub async fn get(
        &self,
        ctx: &SessionContext,
        prescription_id: &str,
    ) -> EngineResult<Prescription> {
        let prescription = self.load(prescription_id).await?;
        ctx.require_owner_or_staff(&prescription.customer_id, "view prescription")?;
        Ok(prescription)
    }

    /// The pharmacist review queue: PENDING prescriptions, oldest first.
    pub async fn review_queue(&self, ctx: &SessionContext) -> EngineResult<Vec<Prescription>> {
        ctx.require_staff("review queue")?;
        Ok(self
            .db
            .prescriptions()
            .list_by_status(PrescriptionStatus::Pending)
            .await?)
    }

    /// A customer's prescription history, newest first.
    pub async fn history(
        &self,
        ctx: &SessionContext,
        customer_id: &str,
    ) -> EngineResult<Vec<Prescription>> {
        ctx.require_owner_or_staff(customer_id, "prescription history")?;
        Ok(self.db.prescriptions().list_by_customer(customer_id).await?)
    }

    async fn load(&self, prescription_id: &str) -> EngineResult<Prescription> {
        self.db
            .prescriptions()
            .get_by_id(prescription_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Prescription", prescription_id))
    }
}

/// A compare-and-set that failed after the guard passed: a concurrent
/// writer moved the row first.
fn race_lost(prescription_id: &str, to: PrescriptionStatus) -> EngineError {
    CoreError::InvalidStateTransition {
        entity: "Prescription",
        id: prescription_id.to_string(),
        from: "concurrently-updated".to_string(),
        to: to.as_str().to_string(),
    }
    .into()
}
