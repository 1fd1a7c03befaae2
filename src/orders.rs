//! Orders
//!
//! Wire shape of an order submission and the gateway that sends it.

use std::hash::Hasher;

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{api::ApiError, menu::Customizations};

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Pay the rider on delivery
    Cash,

    /// Pay by card before the order is created
    Card,
}

/// One order line as sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Backend menu item id
    pub menu_item_id: i64,

    /// Menu item name at the time of ordering
    pub name: String,

    /// Quantity ordered
    pub quantity: u32,

    /// Selected customizations
    pub customizations: Customizations,

    /// Line total, rounded to two places
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

/// Everything about an order except the attempt-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    /// Restaurant the order is placed with
    pub restaurant_id: i64,

    /// Customer name
    pub customer_name: String,

    /// Customer phone number
    pub customer_phone: String,

    /// Customer email from the profile
    pub customer_email: String,

    /// Delivery address
    pub delivery_address: String,

    /// Free-text instructions for the rider
    pub delivery_instructions: Option<String>,

    /// Payment method
    pub payment_method: PaymentMethod,

    /// Customer latitude, when known
    pub customer_latitude: Option<f64>,

    /// Customer longitude, when known
    pub customer_longitude: Option<f64>,

    /// Order lines
    pub items: Vec<OrderLine>,

    /// Food subtotal
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,

    /// Platform fee
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee: Decimal,

    /// Delivery fee
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_fee: Decimal,

    /// Grand total
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl OrderDetails {
    /// Stable hash of the order contents, used to decide whether a retry is the same order.
    ///
    /// # Errors
    ///
    /// Returns an error if the details cannot be serialized.
    pub fn fingerprint(&self) -> Result<u64, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = FxHasher::default();
        hasher.write(&bytes);

        Ok(hasher.finish())
    }
}

/// A complete order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Order contents
    #[serde(flatten)]
    pub details: OrderDetails,

    /// Card payment reference, present only for confirmed card payments
    pub payment_intent_id: Option<String>,

    /// Deduplication key for retried submissions
    pub idempotency_key: Uuid,
}

/// Backend acknowledgement of a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    /// Backend order id
    pub id: i64,

    /// Initial order status, if the backend reports one
    #[serde(default)]
    pub status: Option<String>,
}

/// Submits orders to the backend.
#[automock]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Create an order. Called at most once per checkout attempt.
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError>;
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use testresult::TestResult;

    use super::*;

    fn details() -> OrderDetails {
        OrderDetails {
            restaurant_id: 3,
            customer_name: "Ada".to_string(),
            customer_phone: "07700 900123".to_string(),
            customer_email: "ada@example.com".to_string(),
            delivery_address: "1 Analytical Row".to_string(),
            delivery_instructions: Some("Ring twice".to_string()),
            payment_method: PaymentMethod::Cash,
            customer_latitude: Some(51.5),
            customer_longitude: Some(-0.12),
            items: vec![OrderLine {
                menu_item_id: 9,
                name: "Pad Thai".to_string(),
                quantity: 2,
                customizations: Customizations::default(),
                total_price: Decimal::new(2350, 2),
            }],
            subtotal: Decimal::new(2350, 2),
            platform_fee: Decimal::new(353, 2),
            delivery_fee: Decimal::new(325, 2),
            total_amount: Decimal::new(3028, 2),
        }
    }

    #[test]
    fn serializes_backend_wire_shape() -> TestResult {
        let key = Uuid::new_v4();
        let request = OrderRequest {
            details: details(),
            payment_intent_id: None,
            idempotency_key: key,
        };

        let value = serde_json::to_value(&request)?;

        assert_eq!(value.get("paymentMethod"), Some(&json!("CASH")));
        assert_eq!(value.get("deliveryAddress"), Some(&json!("1 Analytical Row")));
        assert_eq!(value.get("deliveryInstructions"), Some(&json!("Ring twice")));
        assert_eq!(value.get("customerLatitude"), Some(&json!(51.5)));
        assert_eq!(value.get("totalAmount"), Some(&json!(30.28)));
        assert_eq!(value.get("idempotencyKey"), Some(&json!(key.to_string())));
        assert_eq!(value.get("paymentIntentId"), Some(&Value::Null));
        assert_eq!(
            value.pointer("/items/0/menuItemId"),
            Some(&json!(9)),
            "items should use camelCase keys"
        );

        Ok(())
    }

    #[test]
    fn card_method_is_uppercase() -> TestResult {
        assert_eq!(serde_json::to_value(PaymentMethod::Card)?, json!("CARD"));

        Ok(())
    }

    #[test]
    fn fingerprint_tracks_contents() -> TestResult {
        let original = details();
        let mut changed = details();
        changed.items.clear();

        assert_eq!(original.fingerprint()?, details().fingerprint()?);
        assert_ne!(original.fingerprint()?, changed.fingerprint()?);

        Ok(())
    }
}
