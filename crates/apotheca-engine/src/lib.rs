//! # apotheca-engine: Lifecycle Orchestration for Apotheca
//!
//! This crate composes the aggregates into the operations users actually
//! perform: uploading and reviewing prescriptions, paying bills,
//! evaluating alerts, and dispatching notifications.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 apotheca-engine (THIS CRATE)                        │
//! │                                                                     │
//! │  ┌──────────────────┐  ┌────────────────┐  ┌────────────────────┐   │
//! │  │ PrescriptionSvc  │  │ BillingService │  │  AlertEvaluator    │   │
//! │  │ upload/approve/  │  │ pay_online /   │  │  low stock /       │   │
//! │  │ reject/dispense  │  │ collect_pickup │  │  expiry / overdue  │   │
//! │  └────────┬─────────┘  └───────┬────────┘  └─────────┬──────────┘   │
//! │           │    DomainEvent     │                     │              │
//! │           └──────────►┌────────▼─────────┐◄──────────┘              │
//! │                       │ NotificationDisp.│                          │
//! │                       └────────┬─────────┘                          │
//! └────────────────────────────────┼────────────────────────────────────┘
//!                                  ▼
//!              apotheca-db (SQLite) / apotheca-core (rules)
//! ```
//!
//! ## Modules
//!
//! - [`prescriptions`] - Prescription lifecycle service
//! - [`billing`] - Payment selection and settlement
//! - [`inventory`] - Catalog and manual stock operations
//! - [`alerts`] - Threshold/expiry/overdue evaluators (debounced)
//! - [`dispatcher`] - Event → notification fan-out, read tracking
//! - [`events`] - Domain events and their notification rendering
//! - [`payment`] - Payment-gateway boundary trait
//! - [`context`] - Session context and staff directory
//! - [`error`] - Engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod billing;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod inventory;
pub mod payment;
pub mod prescriptions;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::AlertEvaluator;
pub use billing::{BillingService, DEFAULT_GATEWAY_TIMEOUT};
pub use context::{SessionContext, StaffDirectory};
pub use dispatcher::{BulkOutcome, NotificationDispatcher};
pub use error::{EngineError, EngineResult};
pub use events::{Audience, DomainEvent};
pub use inventory::{InventoryService, NewMedicine};
pub use payment::{ChargeRequest, GatewayError, PaymentGateway, PaymentReceipt};
pub use prescriptions::{ApprovedItem, PrescriptionService};

use std::sync::Arc;

use apotheca_db::Database;

/// One-stop wiring of the engine services over a shared database.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("apotheca.db")).await?;
/// let engine = Engine::new(db, staff_directory, Arc::new(gateway));
/// engine.prescriptions.upload(&ctx, "Dr. Mensah").await?;
/// ```
#[derive(Clone)]
pub struct Engine {
    pub prescriptions: PrescriptionService,
    pub billing: BillingService,
    pub inventory: InventoryService,
    pub alerts: AlertEvaluator,
    pub notifications: NotificationDispatcher,
}

impl Engine {
    pub fn new(db: Database, staff: StaffDirectory, gateway: Arc<dyn PaymentGateway>) -> Self {
        let dispatcher = NotificationDispatcher::new(db.clone(), staff);
        let billing = BillingService::new(db.clone(), dispatcher.clone(), gateway);
        Engine {
            prescriptions: PrescriptionService::new(db.clone(), dispatcher.clone()),
            inventory: InventoryService::new(db.clone()),
            alerts: AlertEvaluator::new(db.clone(), dispatcher.clone(), billing.clone()),
            billing,
            notifications: dispatcher,
        }
    }
}
