//! # Lifecycle Guard Tables
//!
//! Transition legality for the prescription and payment state machines,
//! expressed as explicit guard tables rather than scattered conditionals.
//!
//! ## Prescription Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   upload        approve                   settle        complete    │
//! │  ───────► PENDING ────► APPROVED ────► DISPENSED ────► COMPLETED    │
//! │              │                                                      │
//! │              │ reject                                               │
//! │              ▼                                                      │
//! │          REJECTED                                                   │
//! │                                                                     │
//! │  REJECTED and COMPLETED are terminal.                               │
//! │  APPROVED → DISPENSED is gated on the linked bill being PAID        │
//! │  (or happens inside pickup settlement, which is the same event).    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bill Payment Lifecycle
//! ```text
//! PENDING ──► PAID       (pay_online / collect_pickup_payment)
//! PENDING ──► CANCELLED  (cancel / mark_expired)
//! ```
//!
//! The database layer re-checks these guards with compare-and-set
//! updates (`WHERE status = <expected>`); this module is the single
//! source of truth for which edges exist.

use crate::error::{CoreError, CoreResult};
use crate::types::{PaymentStatus, PaymentType, PrescriptionStatus};

// =============================================================================
// Prescription Transitions
// =============================================================================

/// The legal target states from a given prescription status.
pub const fn prescription_targets(from: PrescriptionStatus) -> &'static [PrescriptionStatus] {
    match from {
        PrescriptionStatus::Pending => {
            &[PrescriptionStatus::Approved, PrescriptionStatus::Rejected]
        }
        PrescriptionStatus::Approved => &[PrescriptionStatus::Dispensed],
        PrescriptionStatus::Dispensed => &[PrescriptionStatus::Completed],
        PrescriptionStatus::Rejected | PrescriptionStatus::Completed => &[],
    }
}

/// Validates a prescription transition, returning `InvalidStateTransition`
/// for any edge not in the guard table.
pub fn check_prescription_transition(
    prescription_id: &str,
    from: PrescriptionStatus,
    to: PrescriptionStatus,
) -> CoreResult<()> {
    let allowed = prescription_targets(from);
    if allowed.contains(&to) {
        Ok(())
    } else {
        Err(CoreError::InvalidStateTransition {
            entity: "Prescription",
            id: prescription_id.to_string(),
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// The dispensation gate (joint invariant over prescription and bill).
///
/// A prescription may be dispensed only from APPROVED, and only once the
/// bill is PAID. Pickup settlement flips both inside one transaction, so
/// by the time the prescription row moves the bill row is already PAID.
pub fn check_dispensation(
    prescription_id: &str,
    prescription_status: PrescriptionStatus,
    payment_status: PaymentStatus,
) -> CoreResult<()> {
    check_prescription_transition(
        prescription_id,
        prescription_status,
        PrescriptionStatus::Dispensed,
    )?;
    if payment_status != PaymentStatus::Paid {
        return Err(CoreError::InvalidStateTransition {
            entity: "Prescription",
            id: prescription_id.to_string(),
            from: prescription_status.as_str().to_string(),
            to: PrescriptionStatus::Dispensed.as_str().to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Bill / Payment Transitions
// =============================================================================

/// Validates that a bill operation is legal while the bill is PENDING.
///
/// Every mutating bill command (`set_payment_type`, settlement, `cancel`,
/// `mark_expired`) is legal only from PENDING.
pub fn check_bill_pending(bill_id: &str, current: PaymentStatus, to: PaymentStatus) -> CoreResult<()> {
    if current == PaymentStatus::Pending {
        Ok(())
    } else {
        Err(CoreError::InvalidStateTransition {
            entity: "Bill",
            id: bill_id.to_string(),
            from: current.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// Validates that a bill may be settled through the given payment path.
///
/// `pay_online` requires `payment_type = ONLINE`; `collect_pickup_payment`
/// requires `PAY_ON_PICKUP`. Both require PENDING.
pub fn check_settlement(
    bill_id: &str,
    current_status: PaymentStatus,
    current_type: PaymentType,
    required_type: PaymentType,
) -> CoreResult<()> {
    check_bill_pending(bill_id, current_status, PaymentStatus::Paid)?;
    if current_type != required_type {
        return Err(CoreError::InvalidStateTransition {
            entity: "Bill",
            id: bill_id.to_string(),
            from: format!("{}/{}", current_status.as_str(), current_type.as_str()),
            to: PaymentStatus::Paid.as_str().to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
