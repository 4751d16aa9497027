//! # Payment Gateway Boundary
//!
//! Online payment is an external collaborator behind a trait, so the
//! billing service can be tested without a network and deployments can
//! swap providers.
//!
//! The engine never trusts the gateway with state: the charge happens
//! BEFORE the settlement transaction opens, and a failed or timed-out
//! charge leaves every row untouched.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use apotheca_core::Money;

/// A charge request for the full bill total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub bill_id: String,
    pub bill_number: String,
    pub amount_cents: i64,
    pub card_number: String,
    pub holder_name: String,
}

impl ChargeRequest {
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Proof of a successful charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Gateway transaction id, recorded on the bill as
    /// `payment_reference`.
    pub transaction_id: String,
}

/// Gateway-side failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The charge was refused (insufficient funds, blocked card, ...).
    #[error("charge declined: {0}")]
    Declined(String),

    /// The provider could not be reached or returned an error.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// The payment collaborator seam.
///
/// Implementations must be safe to call concurrently; the engine bounds
/// every call with a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<PaymentReceipt, GatewayError>;
}
