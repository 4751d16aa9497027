//! # Validation Module
//!
//! Input validation for commands, run before any business logic.
//!
//! Validation here is defense in depth: the UI layer validates for
//! immediate feedback, this module validates business rules, and the
//! database enforces NOT NULL / CHECK constraints last.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a human name field (doctor name, medicine name).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
pub fn validate_name(field: &'static str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.len() > 200 {
        return Err(ValidationError::TooLong { field, max: 200 });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a strictly positive quantity.
pub fn validate_quantity(field: &'static str, quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive { field });
    }
    Ok(())
}

/// Validates a non-negative amount (restock quantity, discount, tax).
pub fn validate_non_negative(field: &'static str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative { field });
    }
    Ok(())
}

// =============================================================================
// Payment Detail Validators
// =============================================================================

/// Validates card details for presence and plausible length only.
///
/// Real validation (Luhn, issuer, expiry) is delegated to the external
/// payment collaborator; the core only refuses obviously empty input
/// before making the call.
pub fn validate_card_details(card_number: &str, holder_name: &str) -> ValidationResult<()> {
    let digits = card_number.trim();
    if digits.is_empty() {
        return Err(ValidationError::Required { field: "card_number" });
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card_number",
            reason: "must contain only digits",
        });
    }
    if digits.len() < 12 {
        return Err(ValidationError::TooShort { field: "card_number", min: 12 });
    }
    if digits.len() > 19 {
        return Err(ValidationError::TooLong { field: "card_number", max: 19 });
    }

    validate_name("holder_name", holder_name)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("doctor_name", "Dr. Osei").is_ok());
        assert!(validate_name("doctor_name", "   ").is_err());
        assert!(validate_name("doctor_name", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1).is_ok());
        assert!(validate_quantity("quantity", 0).is_err());
        assert!(validate_quantity("quantity", -5).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("discount", 0).is_ok());
        assert!(validate_non_negative("discount", -1).is_err());
    }

    #[test]
    fn test_validate_card_details() {
        assert!(validate_card_details("4242424242424242", "A Customer").is_ok());
        assert!(validate_card_details("", "A Customer").is_err());
        assert!(validate_card_details("4242-4242", "A Customer").is_err());
        assert!(validate_card_details("42424242", "A Customer").is_err());
        assert!(validate_card_details("4242424242424242", "").is_err());
    }
}
