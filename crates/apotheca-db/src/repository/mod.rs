//! # Repository Module
//!
//! Database repository implementations for Apotheca.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Engine service                                                         │
//! │       │                                                                 │
//! │       │  db.medicines().deduct("med-1", 2)                              │
//! │       ▼                                                                 │
//! │  MedicineRepository                                                     │
//! │  ├── deduct(&self, id, quantity)                                        │
//! │  ├── restock(&self, id, quantity)                                       │
//! │  └── list_below_reorder(&self)                                          │
//! │       │                                                                 │
//! │       │  SQL (guarded UPDATE / compare-and-set)                         │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-aggregate transitions (approval, settlement) use the static
//! `*_in_tx` variants with a transaction obtained from
//! [`Database::begin`](crate::pool::Database::begin).
//!
//! ## Available Repositories
//!
//! - [`medicine::MedicineRepository`] - Inventory ledger: guarded deduction, restock, threshold/expiry scans
//! - [`prescription::PrescriptionRepository`] - Prescription state machine writes (compare-and-set)
//! - [`bill::BillRepository`] - Bills, line-item snapshots, settlement writes
//! - [`notification::NotificationRepository`] - Persisted notifications and read tracking
//! - [`alert_log::AlertLogRepository`] - Durable once-per-day alert debounce

pub mod alert_log;
pub mod bill;
pub mod medicine;
pub mod notification;
pub mod prescription;
