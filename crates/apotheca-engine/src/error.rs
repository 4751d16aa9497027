//! # Engine Error Types
//!
//! The engine error wraps the lower layers and adds the failures only
//! orchestration can produce (missing aggregates, gateway problems,
//! permission refusals).
//!
//! ## Error Flow
//! ```text
//! CoreError (guard tables, validation, arithmetic)
//! DbError   (SQLite, constraints)
//!      │
//!      ▼
//! EngineError (this module)
//! ```

use thiserror::Error;

use apotheca_core::CoreError;
use apotheca_db::DbError;

/// Errors surfaced by the engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business-rule violation from the pure core (illegal transition,
    /// validation failure, insufficient stock).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A referenced aggregate does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller's role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The payment collaborator refused the charge. No state changed.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// An external collaborator failed or timed out. No state changed.
    #[error("External service failure: {0}")]
    ExternalService(String),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Raw sqlx errors reach the engine only from transaction
/// commit/rollback; route them through the db layer's categorization.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_errors_map_through_db_layer() {
        // Transaction commit/rollback surface sqlx::Error directly; the
        // engine must categorize them the same way the repositories do.
        let err: EngineError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, EngineError::Db(DbError::PoolExhausted)));

        let err: EngineError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, EngineError::Db(DbError::ConnectionFailed(_))));
    }
}
