//! Checkout errors.

use thiserror::Error;

use crate::{
    api::ApiError,
    checkout::{
        models::CheckoutState,
        validation::{ValidationErrors, join},
    },
    payments::PaymentError,
    pricing::{PricingError, TotalPriceError},
};

/// Checkout error variants.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Required fields were missing.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// The delivery fee or totals could not be computed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The cart could not be priced.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// The card payment did not go through. No order was created.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The order could not be created. Nothing was charged.
    #[error("order submission failed")]
    OrderSubmission(#[source] ApiError),

    /// The card was charged but the order could not be created.
    #[error("payment {payment_intent_id} succeeded but order submission failed")]
    PaidOrderFailed {
        /// Provider reference for the successful charge
        payment_intent_id: String,

        /// Why the order could not be created
        #[source]
        source: ApiError,
    },

    /// The order payload could not be serialized.
    #[error("failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pipeline was asked to make an illegal move.
    #[error("cannot move checkout from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: CheckoutState,

        /// Requested state
        to: CheckoutState,
    },
}

impl CheckoutError {
    /// Text to show the customer.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => format!("Please fill in your {}.", join(errors.fields())),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::Payment(PaymentError::Declined(reason)) => {
                format!("Your card was declined: {reason}")
            }
            Self::Payment(PaymentError::Cancelled) => "Payment was cancelled.".to_string(),
            Self::Payment(PaymentError::Provider(_)) => {
                "We couldn't process your payment. Please try again.".to_string()
            }
            Self::OrderSubmission(_) => {
                "We couldn't place your order. Please try again.".to_string()
            }
            Self::PaidOrderFailed {
                payment_intent_id, ..
            } => format!(
                "Your payment went through but we couldn't create your order. \
                 Please contact support with payment reference {payment_intent_id}."
            ),
            Self::Pricing(_)
            | Self::TotalPrice(_)
            | Self::Serialization(_)
            | Self::InvalidTransition { .. } => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    /// Whether support must step in because money was taken without an order.
    pub fn requires_support(&self) -> bool {
        matches!(self, Self::PaidOrderFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_order_failure_asks_for_support() {
        let error = CheckoutError::PaidOrderFailed {
            payment_intent_id: "pi_123".to_string(),
            source: ApiError::NotFound("orders".to_string()),
        };

        let message = error.user_message();

        assert!(error.requires_support(), "paid order failure needs support");
        assert!(message.contains("contact support"), "got {message}");
        assert!(message.contains("pi_123"), "got {message}");
    }

    #[test]
    fn submission_failure_is_retryable() {
        let error = CheckoutError::OrderSubmission(ApiError::UnexpectedResponse {
            status: 503,
            body: String::new(),
        });

        assert!(!error.requires_support(), "nothing was charged");
        assert_eq!(
            error.user_message(),
            "We couldn't place your order. Please try again."
        );
    }

    #[test]
    fn declined_card_explains_reason() {
        let error = CheckoutError::from(PaymentError::Declined("insufficient funds".to_string()));

        assert_eq!(
            error.user_message(),
            "Your card was declined: insufficient funds"
        );
    }
}
