//! # Bill Arithmetic
//!
//! Pure functions computing bill line totals and the grand total.
//!
//! ## Numeric Invariant
//! Enforced on every mutation of bill items:
//! ```text
//! line.total_cents  = quantity * unit_price_cents        (exact, integer)
//! subtotal_cents    = Σ line.total_cents
//! total_cents       = max(0, subtotal - discount + tax)
//! discount, tax >= 0
//! ```
//! All values are integer cents, so multiplication is exact and the
//! "round to 2 decimals" requirement is a no-op by construction.

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;

/// Input for a bill line: a price snapshot plus the approved quantity.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub medicine_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

/// A computed bill line total.
#[derive(Debug, Clone)]
pub struct ComputedLine {
    pub medicine_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub total: Money,
}

/// The denormalized totals stored on the bill row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes line totals and bill totals from approved items.
///
/// ## Errors
/// - `EmptyList` if no lines are supplied
/// - `MustBePositive` if any quantity is not positive
/// - `MustNotBeNegative` if discount or tax is negative
///
/// ## Example
/// ```rust
/// use apotheca_core::billing::{compute_bill, LineInput};
/// use apotheca_core::money::Money;
///
/// let lines = vec![
///     LineInput {
///         medicine_id: "m1".into(),
///         name: "Ibuprofen".into(),
///         unit_price: Money::from_cents(1000),
///         quantity: 3,
///     },
///     LineInput {
///         medicine_id: "m2".into(),
///         name: "Vitamin C".into(),
///         unit_price: Money::from_cents(500),
///         quantity: 1,
///     },
/// ];
/// let (computed, totals) = compute_bill(&lines, Money::zero(), Money::zero()).unwrap();
/// assert_eq!(totals.subtotal.cents(), 3500);
/// assert_eq!(totals.total.cents(), 3500);
/// assert_eq!(computed[0].total.cents(), 3000);
/// ```
pub fn compute_bill(
    lines: &[LineInput],
    discount: Money,
    tax: Money,
) -> CoreResult<(Vec<ComputedLine>, BillTotals)> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyList { field: "items" }.into());
    }
    if discount.is_negative() {
        return Err(ValidationError::MustNotBeNegative { field: "discount" }.into());
    }
    if tax.is_negative() {
        return Err(ValidationError::MustNotBeNegative { field: "tax" }.into());
    }

    let mut computed = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();

    for line in lines {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive { field: "quantity" }.into());
        }
        let total = line.unit_price.multiply_quantity(line.quantity);
        subtotal += total;
        computed.push(ComputedLine {
            medicine_id: line.medicine_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            total,
        });
    }

    let total = (subtotal - discount + tax).clamp_non_negative();

    Ok((
        computed,
        BillTotals {
            subtotal,
            discount,
            tax,
            total,
        },
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn line(id: &str, price_cents: i64, qty: i64) -> LineInput {
        LineInput {
            medicine_id: id.to_string(),
            name: format!("Medicine {id}"),
            unit_price: Money::from_cents(price_cents),
            quantity: qty,
        }
    }

    #[test]
    fn test_two_line_bill() {
        // qty 3 @ $10 + qty 1 @ $5 → subtotal $35, no tax/discount.
        let (computed, totals) =
            compute_bill(&[line("a", 1000, 3), line("b", 500, 1)], Money::zero(), Money::zero())
                .unwrap();

        assert_eq!(computed.len(), 2);
        assert_eq!(computed[0].total.cents(), 3000);
        assert_eq!(computed[1].total.cents(), 500);
        assert_eq!(totals.subtotal.cents(), 3500);
        assert_eq!(totals.total.cents(), 3500);
    }

    #[test]
    fn test_discount_and_tax() {
        let (_, totals) = compute_bill(
            &[line("a", 1000, 2)],
            Money::from_cents(300),
            Money::from_cents(150),
        )
        .unwrap();
        assert_eq!(totals.total.cents(), 2000 - 300 + 150);
    }

    #[test]
    fn test_total_clamped_to_zero() {
        // Discount larger than subtotal: total clamps at zero instead of
        // going negative.
        let (_, totals) =
            compute_bill(&[line("a", 100, 1)], Money::from_cents(500), Money::zero()).unwrap();
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = compute_bill(&[], Money::zero(), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyList { .. })));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let err = compute_bill(&[line("a", 100, 0)], Money::zero(), Money::zero()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let err =
            compute_bill(&[line("a", 100, 1)], Money::from_cents(-1), Money::zero()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustNotBeNegative { .. })
        ));
    }
}
