//! # Domain Types
//!
//! Core domain types used throughout Apotheca.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │   Medicine    │   │ Prescription  │   │     Bill      │          │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │          │
//! │  │  id (UUID)    │   │  id (UUID)    │   │  id (UUID)    │          │
//! │  │  quantity     │   │  status       │   │  bill_number  │          │
//! │  │  reorder_level│   │  customer_id  │   │  payment_*    │          │
//! │  │  expiry_date  │   │  doctor_name  │   │  total_cents  │          │
//! │  └───────────────┘   └───────────────┘   └───────────────┘          │
//! │                                                                     │
//! │  PrescriptionStatus: PENDING → {APPROVED, REJECTED}                 │
//! │                      APPROVED → DISPENSED → COMPLETED               │
//! │  PaymentStatus:      PENDING → {PAID, CANCELLED}                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Bills carry both a UUID `id` (immutable, used for relations) and a
//! human-readable `bill_number` (printed on the customer's copy).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Roles & Session Context
// =============================================================================

/// Role tag supplied by the identity provider.
///
/// The core trusts this input and does not re-authenticate; it is used
/// only for ownership and notification addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Pharmacist,
    Customer,
}

// =============================================================================
// Medicine
// =============================================================================

/// A medicine stock record in the inventory ledger.
///
/// Invariant: `quantity` is never negative. Deductions that would go
/// negative are rejected before any state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Medicine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Units currently on hand. Never negative.
    pub quantity: i64,

    /// Threshold at or below which the medicine is considered low stock.
    pub reorder_level: i64,

    /// Unit price in cents (smallest currency unit).
    pub unit_price_cents: i64,

    /// Expiry date of the current batch, if tracked.
    pub expiry_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Whether the medicine is at or below its reorder level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Whether the batch has expired as of `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(d) if d < today)
    }
}

// =============================================================================
// Prescription
// =============================================================================

/// The lifecycle status of a prescription.
///
/// REJECTED and COMPLETED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    /// Uploaded, awaiting pharmacist review.
    Pending,
    /// Reviewed and approved; a bill exists.
    Approved,
    /// Reviewed and rejected. Terminal.
    Rejected,
    /// Medication released to the customer.
    Dispensed,
    /// Fulfilled and closed. Terminal.
    Completed,
}

impl PrescriptionStatus {
    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Approved => "approved",
            PrescriptionStatus::Rejected => "rejected",
            PrescriptionStatus::Dispensed => "dispensed",
            PrescriptionStatus::Completed => "completed",
        }
    }

    /// Whether no further transitions are legal from this status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, PrescriptionStatus::Rejected | PrescriptionStatus::Completed)
    }
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        PrescriptionStatus::Pending
    }
}

/// A customer's uploaded prescription.
///
/// Owned by the uploading customer; mutated only by pharmacist/admin
/// review actions and by bill settlement (dispensation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Prescription {
    pub id: String,
    pub customer_id: String,
    pub status: PrescriptionStatus,
    pub doctor_name: String,
    pub uploaded_at: DateTime<Utc>,
    /// Set when the prescription is approved or rejected.
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A prescribed line item, recorded at approval time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PrescriptionItem {
    pub id: String,
    pub prescription_id: String,
    pub medicine_id: String,
    pub quantity: i64,
    pub instructions: Option<String>,
}

// =============================================================================
// Bill & Payment
// =============================================================================

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Not chosen yet. Bills start here.
    Unset,
    /// Prepaid through the online payment collaborator.
    Online,
    /// Collected in person at medication handoff.
    PayOnPickup,
}

impl PaymentType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Unset => "unset",
            PaymentType::Online => "online",
            PaymentType::PayOnPickup => "pay_on_pickup",
        }
    }
}

/// Payment status of a bill.
///
/// PAID and CANCELLED are terminal. PARTIALLY_PAID exists for wire
/// compatibility with the source data model; no operation in this core
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Cancelled)
    }
}

/// Method used for an in-person pickup payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PickupMethod {
    Cash,
    Card,
    BankTransfer,
    Other,
}

impl PickupMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PickupMethod::Cash => "cash",
            PickupMethod::Card => "card",
            PickupMethod::BankTransfer => "bank_transfer",
            PickupMethod::Other => "other",
        }
    }
}

/// The billable artifact generated from an approved prescription.
///
/// Numeric invariant, enforced on every mutation of the items:
/// `total_cents = subtotal_cents - discount_cents + tax_cents`,
/// clamped to zero, with discount and tax non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    /// Not all bills need a prescription (over-the-counter sales).
    pub prescription_id: Option<String>,
    /// Paying customer.
    pub customer_id: String,
    /// Human-readable business identifier (RX-YYYYMMDD-NNNN).
    pub bill_number: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_type: PaymentType,
    pub payment_status: PaymentStatus,
    /// Gateway transaction id or pickup method, set on settlement.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set only on transition to PAID.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on a bill.
/// Uses the snapshot pattern to freeze medicine data at billing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub medicine_id: String,
    /// Medicine name at billing time (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at billing time (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Invariant: `total_cents = quantity * unit_price_cents`.
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notification
// =============================================================================

/// The kind of a persisted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    ExpiryAlert,
    PrescriptionUploaded,
    PrescriptionApproved,
    PrescriptionRejected,
    BillGenerated,
    SystemAlert,
    UserRegistration,
}

impl NotificationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::LowStock => "low_stock",
            NotificationKind::ExpiryAlert => "expiry_alert",
            NotificationKind::PrescriptionUploaded => "prescription_uploaded",
            NotificationKind::PrescriptionApproved => "prescription_approved",
            NotificationKind::PrescriptionRejected => "prescription_rejected",
            NotificationKind::BillGenerated => "bill_generated",
            NotificationKind::SystemAlert => "system_alert",
            NotificationKind::UserRegistration => "user_registration",
        }
    }
}

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// A persisted, typed notification delivered to one user.
///
/// Created only by the notification dispatcher; mutated only by
/// read/delete actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
