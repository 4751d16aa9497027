//! # Domain Events
//!
//! Every lifecycle transition that users should hear about is modeled as
//! a `DomainEvent`. The dispatcher turns one event into one persisted
//! notification per resolved recipient; the mapping from event to
//! kind/priority/title/message lives here so the services never build
//! notification text by hand.
//!
//! ## Event → Notification Mapping
//! ```text
//! PrescriptionUploaded  → staff     PRESCRIPTION_UPLOADED  MEDIUM
//! PrescriptionApproved  → customer  PRESCRIPTION_APPROVED  MEDIUM
//! PrescriptionRejected  → customer  PRESCRIPTION_REJECTED  HIGH
//! BillGenerated         → customer  BILL_GENERATED         MEDIUM
//! PaymentCollected      → customer  SYSTEM_ALERT           LOW
//! BillExpired           → customer  SYSTEM_ALERT           MEDIUM
//! LowStock              → staff     LOW_STOCK              MEDIUM / HIGH (out of stock)
//! ExpiringBatch         → staff     EXPIRY_ALERT           HIGH / CRITICAL (already expired)
//! UserRegistered        → admins    USER_REGISTRATION      LOW
//! ```

use chrono::NaiveDate;

use apotheca_core::{Money, NotificationKind, Priority};

/// Who an event is addressed to. The dispatcher resolves `Staff` and
/// `Admins` through its [`StaffDirectory`](crate::context::StaffDirectory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// A single user (usually the owning customer).
    User(String),
    /// All pharmacists and admins.
    Staff,
    /// Admins only.
    Admins,
}

/// A lifecycle transition worth telling someone about.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    PrescriptionUploaded {
        prescription_id: String,
        customer_id: String,
        doctor_name: String,
    },
    PrescriptionApproved {
        prescription_id: String,
        customer_id: String,
        bill_number: String,
        total: Money,
    },
    PrescriptionRejected {
        prescription_id: String,
        customer_id: String,
        reason: String,
    },
    BillGenerated {
        bill_id: String,
        bill_number: String,
        customer_id: String,
        total: Money,
    },
    PaymentCollected {
        bill_id: String,
        bill_number: String,
        customer_id: String,
        total: Money,
    },
    BillExpired {
        bill_id: String,
        bill_number: String,
        customer_id: String,
    },
    LowStock {
        medicine_id: String,
        name: String,
        quantity: i64,
        reorder_level: i64,
    },
    ExpiringBatch {
        medicine_id: String,
        name: String,
        expiry_date: NaiveDate,
        expired: bool,
    },
    UserRegistered {
        user_id: String,
        display_name: String,
    },
}

impl DomainEvent {
    /// The persisted notification kind for this event.
    pub fn kind(&self) -> NotificationKind {
        match self {
            DomainEvent::PrescriptionUploaded { .. } => NotificationKind::PrescriptionUploaded,
            DomainEvent::PrescriptionApproved { .. } => NotificationKind::PrescriptionApproved,
            DomainEvent::PrescriptionRejected { .. } => NotificationKind::PrescriptionRejected,
            DomainEvent::BillGenerated { .. } => NotificationKind::BillGenerated,
            DomainEvent::PaymentCollected { .. } | DomainEvent::BillExpired { .. } => {
                NotificationKind::SystemAlert
            }
            DomainEvent::LowStock { .. } => NotificationKind::LowStock,
            DomainEvent::ExpiringBatch { .. } => NotificationKind::ExpiryAlert,
            DomainEvent::UserRegistered { .. } => NotificationKind::UserRegistration,
        }
    }

    /// Severity grading. Stock-outs outrank low stock; already-expired
    /// batches outrank soon-to-expire ones.
    pub fn priority(&self) -> Priority {
        match self {
            DomainEvent::PaymentCollected { .. } | DomainEvent::UserRegistered { .. } => {
                Priority::Low
            }
            DomainEvent::PrescriptionRejected { .. } => Priority::High,
            DomainEvent::LowStock { quantity, .. } => {
                if *quantity == 0 {
                    Priority::High
                } else {
                    Priority::Medium
                }
            }
            DomainEvent::ExpiringBatch { expired, .. } => {
                if *expired {
                    Priority::Critical
                } else {
                    Priority::High
                }
            }
            _ => Priority::Medium,
        }
    }

    /// Who should receive this event.
    pub fn audience(&self) -> Audience {
        match self {
            DomainEvent::PrescriptionUploaded { .. } => Audience::Staff,
            DomainEvent::LowStock { .. } | DomainEvent::ExpiringBatch { .. } => Audience::Staff,
            DomainEvent::UserRegistered { .. } => Audience::Admins,
            DomainEvent::PrescriptionApproved { customer_id, .. }
            | DomainEvent::PrescriptionRejected { customer_id, .. }
            | DomainEvent::BillGenerated { customer_id, .. }
            | DomainEvent::PaymentCollected { customer_id, .. }
            | DomainEvent::BillExpired { customer_id, .. } => Audience::User(customer_id.clone()),
        }
    }

    /// Short title shown in notification lists.
    pub fn title(&self) -> String {
        match self {
            DomainEvent::PrescriptionUploaded { .. } => "New prescription awaiting review".into(),
            DomainEvent::PrescriptionApproved { .. } => "Prescription approved".into(),
            DomainEvent::PrescriptionRejected { .. } => "Prescription rejected".into(),
            DomainEvent::BillGenerated { bill_number, .. } => {
                format!("Bill {bill_number} generated")
            }
            DomainEvent::PaymentCollected { .. } => "Payment received".into(),
            DomainEvent::BillExpired { bill_number, .. } => format!("Bill {bill_number} expired"),
            DomainEvent::LowStock { name, quantity, .. } => {
                if *quantity == 0 {
                    format!("Out of stock: {name}")
                } else {
                    format!("Low stock: {name}")
                }
            }
            DomainEvent::ExpiringBatch { name, expired, .. } => {
                if *expired {
                    format!("Expired batch: {name}")
                } else {
                    format!("Batch expiring soon: {name}")
                }
            }
            DomainEvent::UserRegistered { .. } => "New user registered".into(),
        }
    }

    /// Full message body.
    pub fn message(&self) -> String {
        match self {
            DomainEvent::PrescriptionUploaded {
                prescription_id,
                doctor_name,
                ..
            } => format!(
                "Prescription {prescription_id} from {doctor_name} is waiting for review."
            ),
            DomainEvent::PrescriptionApproved {
                prescription_id,
                bill_number,
                total,
                ..
            } => format!(
                "Prescription {prescription_id} was approved. Bill {bill_number} for {total} is ready for payment."
            ),
            DomainEvent::PrescriptionRejected {
                prescription_id,
                reason,
                ..
            } => format!("Prescription {prescription_id} was rejected: {reason}"),
            DomainEvent::BillGenerated {
                bill_number, total, ..
            } => format!("Bill {bill_number} for {total} has been generated."),
            DomainEvent::PaymentCollected {
                bill_number, total, ..
            } => format!("Payment of {total} received for bill {bill_number}."),
            DomainEvent::BillExpired { bill_number, .. } => format!(
                "Bill {bill_number} was not paid in time and has been cancelled."
            ),
            DomainEvent::LowStock {
                name,
                quantity,
                reorder_level,
                ..
            } => format!(
                "{name} is down to {quantity} units (reorder level {reorder_level})."
            ),
            DomainEvent::ExpiringBatch {
                name,
                expiry_date,
                expired,
                ..
            } => {
                if *expired {
                    format!("{name} expired on {expiry_date}. Remove it from shelves.")
                } else {
                    format!("{name} expires on {expiry_date}.")
                }
            }
            DomainEvent::UserRegistered {
                user_id,
                display_name,
            } => format!("{display_name} ({user_id}) has registered."),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
