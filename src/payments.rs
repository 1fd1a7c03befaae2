//! Card payments
//!
//! Card checkout delegates to an external payment provider. An order may only
//! be created once [`PaymentProvider::confirm_card_payment`] reports success.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use uuid::Uuid;

/// A card charge to confirm with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Amount in minor units
    pub amount: i64,

    /// ISO currency code
    pub currency: &'static str,

    /// Customer email for the provider's receipt
    pub customer_email: String,

    /// Idempotency key shared with the order request
    pub idempotency_key: Uuid,
}

/// Successful confirmation from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Provider reference, forwarded with the order as `paymentIntentId`
    pub payment_intent_id: String,
}

/// Reasons a card payment did not go through.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The card was declined.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The customer abandoned the payment step.
    #[error("payment cancelled")]
    Cancelled,

    /// Provider or transport failure.
    #[error("payment provider error: {0}")]
    Provider(String),
}

/// Confirms card payments.
#[automock]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Confirm a card payment. Resolves only once the provider has a final answer.
    async fn confirm_card_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentConfirmation, PaymentError>;
}

/// Provider used when no card integration is configured; every card payment fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardPaymentsUnavailable;

#[async_trait]
impl PaymentProvider for CardPaymentsUnavailable {
    async fn confirm_card_payment(
        &self,
        _request: &PaymentRequest,
    ) -> Result<PaymentConfirmation, PaymentError> {
        Err(PaymentError::Provider(
            "card payments are not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_provider_always_fails() {
        let request = PaymentRequest {
            amount: 12_34,
            currency: "GBP",
            customer_email: "ada@example.com".to_string(),
            idempotency_key: Uuid::new_v4(),
        };

        let result = CardPaymentsUnavailable.confirm_card_payment(&request).await;

        assert!(
            matches!(result, Err(PaymentError::Provider(_))),
            "expected provider error, got {result:?}"
        );
    }
}
