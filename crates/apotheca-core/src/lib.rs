//! # apotheca-core: Pure Business Logic for Apotheca
//!
//! This crate is the heart of the pharmacy order-lifecycle core. It
//! contains all business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Apotheca Architecture                           │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                apotheca-engine (services)                   │    │
//! │  │  upload / approve / settle / evaluate alerts / dispatch     │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │             ★ apotheca-core (THIS CRATE) ★                  │    │
//! │  │                                                             │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌────────────┐      │    │
//! │  │   │  types  │ │  money  │ │ lifecycle │ │  billing   │      │    │
//! │  │   │ Medicine│ │  Money  │ │  guards   │ │ bill math  │      │    │
//! │  │   │ Bill ...│ │  cents  │ │           │ │            │      │    │
//! │  │   └─────────┘ └─────────┘ └───────────┘ └────────────┘      │    │
//! │  │                                                             │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS        │    │
//! │  └──────────────────────────┬──────────────────────────────────┘    │
//! │                             │                                       │
//! │  ┌──────────────────────────▼──────────────────────────────────┐    │
//! │  │                apotheca-db (SQLite layer)                   │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Medicine, Prescription, Bill, Notification)
//! - [`money`] - Integer-cents money type (no floating point)
//! - [`lifecycle`] - State-machine guard tables
//! - [`billing`] - Bill line and total arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Command input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, same input = same output
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default horizon, in days, for the expiring-batch alert scan.
pub const DEFAULT_EXPIRY_HORIZON_DAYS: i64 = 30;

/// Default age, in days, after which a PENDING bill is considered
/// overdue and eligible for expiry cancellation.
pub const DEFAULT_BILL_MAX_AGE_DAYS: i64 = 7;

/// Maximum line items accepted on a single approval.
///
/// Prevents runaway bills from mistyped input; generous compared to any
/// real prescription.
pub const MAX_PRESCRIPTION_ITEMS: usize = 100;
