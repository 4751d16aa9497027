//! # Error Types
//!
//! Domain-specific error types for apotheca-core.
//!
//! ## Error Hierarchy
//! ```text
//! apotheca-core errors (this file)
//! ├── CoreError        - Business rule violations
//! └── ValidationError  - Input validation failures
//!
//! apotheca-db errors (separate crate)
//! └── DbError          - Database operation failures
//!
//! apotheca-engine errors (separate crate)
//! └── EngineError      - Wraps the above, adds NotFound/ExternalService
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, id, states)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. All of them are
/// recoverable by the caller: re-read state and retry the correct
/// operation, restock, or fix the input.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle transition was attempted from an illegal source state.
    ///
    /// ## When This Occurs
    /// - Approving a prescription that is not PENDING
    /// - Collecting payment on a bill that is already PAID or CANCELLED
    /// - Completing a prescription that was never dispensed
    #[error("{entity} {id}: illegal transition {from} -> {to}")]
    InvalidStateTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// A stock deduction would drive a medicine's quantity negative.
    ///
    /// Recoverable by restocking or reducing the requested quantity.
    #[error("Insufficient stock for medicine {medicine_id}: available {available}, requested {requested}")]
    InsufficientStock {
        medicine_id: String,
        available: i64,
        requested: i64,
    },

    /// A non-positive quantity was supplied where a positive one is required.
    #[error("Invalid quantity: {requested}")]
    InvalidQuantity { requested: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when command input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: &'static str },

    /// A list that must contain at least one element was empty.
    #[error("{field} must contain at least one entry")]
    EmptyList { field: &'static str },

    /// Invalid format (e.g., non-digit characters in a card number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
