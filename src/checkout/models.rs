//! Checkout Models

use std::fmt;

use rusty_money::{Money, iso::Currency};

use crate::{pricing::CheckoutTotals, restaurants::Restaurant};

/// Details the customer enters at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    /// Customer name
    pub name: String,

    /// Contact phone number
    pub phone: String,

    /// Delivery address
    pub address: String,

    /// Optional notes for the rider
    pub instructions: Option<String>,
}

/// Where a checkout attempt currently is.
///
/// ```text
/// Idle -> Validating -> Idle                             (invalid)
/// Idle -> Validating -> Submitting -> Submitted -> Idle  (success)
///                       Submitting -> Idle               (failure)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckoutState {
    /// Waiting for the customer
    #[default]
    Idle,

    /// Checking the form and cart
    Validating,

    /// Payment and order submission in flight
    Submitting,

    /// Order created
    Submitted,
}

impl CheckoutState {
    /// Whether the pipeline may move from `self` to `next`.
    pub fn can_transition_to(self, next: CheckoutState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Validating, Self::Idle | Self::Submitting)
                | (Self::Submitting, Self::Submitted | Self::Idle)
                | (Self::Submitted, Self::Idle)
        )
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
        };

        f.write_str(name)
    }
}

/// Priced view of the current cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutQuote {
    /// Restaurant details, if they could be fetched
    pub restaurant: Option<Restaurant>,

    /// Delivery distance, when both ends are known
    pub distance_km: Option<f64>,

    /// Cost breakdown
    pub totals: CheckoutTotals,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    /// Backend order id
    pub order_id: i64,

    /// Initial order status, if reported
    pub status: Option<String>,

    /// Card payment reference, for card orders
    pub payment_intent_id: Option<String>,

    /// Amount charged or due on delivery
    pub total: Money<'static, Currency>,
}
