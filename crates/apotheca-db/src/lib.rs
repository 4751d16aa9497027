//! # apotheca-db: Database Layer for Apotheca
//!
//! This crate provides database access for the Apotheca pharmacy engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Apotheca Data Flow                                │
//! │                                                                         │
//! │  Engine service (BillingService::collect_pickup_payment)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apotheca-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ (medicine.rs)  │   │  (embedded)  │   │   │
//! │  │   │               │    │                │   │              │   │   │
//! │  │   │ SqlitePool    │◄───│ MedicineRepo   │   │ 001_initial_ │   │   │
//! │  │   │ Transactions  │    │ BillRepo       │   │ schema.sql   │   │   │
//! │  │   │               │    │ Prescription.. │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                        SQLite Database (WAL)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (medicine, prescription, bill, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apotheca_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("path/to/apotheca.db");
//! let db = Database::new(config).await?;
//!
//! let low = db.medicines().list_below_reorder().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::alert_log::AlertLogRepository;
pub use repository::bill::{
    generate_bill_id, generate_bill_item_id, generate_bill_number, BillRepository,
};
pub use repository::medicine::{generate_medicine_id, DeductOutcome, MedicineRepository};
pub use repository::notification::{
    generate_notification_id, NotificationFilter, NotificationRepository,
};
pub use repository::prescription::{generate_prescription_id, PrescriptionRepository};
