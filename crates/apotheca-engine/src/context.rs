//! # Session Context & Staff Directory
//!
//! Identity is an external collaborator: callers arrive with an already
//! authenticated `SessionContext` and the engine only checks roles and
//! ownership against it. There is no credential handling here.

use serde::{Deserialize, Serialize};

use apotheca_core::UserRole;

use crate::error::{EngineError, EngineResult};

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
    pub role: UserRole,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        SessionContext {
            user_id: user_id.into(),
            role,
        }
    }

    /// Whether the caller is pharmacy staff (pharmacist or admin).
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Pharmacist | UserRole::Admin)
    }

    /// Requires a staff role for review/dispense/collect operations.
    pub fn require_staff(&self, operation: &str) -> EngineResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "{operation} requires a pharmacist or admin role"
            )))
        }
    }

    /// Requires that the caller owns the record, unless they are staff.
    pub fn require_owner_or_staff(&self, owner_id: &str, operation: &str) -> EngineResult<()> {
        if self.is_staff() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!(
                "{operation} is limited to the owning customer"
            )))
        }
    }
}

/// Recipient lists for role-addressed notifications.
///
/// Supplied by the identity collaborator at engine construction; the
/// dispatcher persists one notification row per resolved recipient.
#[derive(Debug, Clone, Default)]
pub struct StaffDirectory {
    /// Pharmacist user ids.
    pub pharmacists: Vec<String>,
    /// Admin user ids.
    pub admins: Vec<String>,
}

impl StaffDirectory {
    pub fn new(pharmacists: Vec<String>, admins: Vec<String>) -> Self {
        StaffDirectory {
            pharmacists,
            admins,
        }
    }

    /// All staff recipients (pharmacists and admins), deduplicated,
    /// order preserved.
    pub fn staff(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.pharmacists.len() + self.admins.len());
        for id in self.pharmacists.iter().chain(self.admins.iter()) {
            if !out.iter().any(|existing| existing == id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// Admin recipients only (registration events).
    pub fn admin_recipients(&self) -> Vec<String> {
        self.admins.clone()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_checks() {
        let customer = SessionContext::new("cust-1", UserRole::Customer);
        let pharmacist = SessionContext::new("pharm-1", UserRole::Pharmacist);

        assert!(customer.require_staff("approve").is_err());
        assert!(pharmacist.require_staff("approve").is_ok());

        assert!(customer.require_owner_or_staff("cust-1", "view").is_ok());
        assert!(customer.require_owner_or_staff("cust-2", "view").is_err());
        assert!(pharmacist.require_owner_or_staff("cust-2", "view").is_ok());
    }

    #[test]
    fn test_staff_directory_dedup() {
        let dir = StaffDirectory::new(
            vec!["p1".into(), "both".into()],
            vec!["both".into(), "a1".into()],
        );
        assert_eq!(dir.staff(), vec!["p1", "both", "a1"]);
    }
}
