//! Checkout

pub mod errors;
pub mod models;
pub mod service;
pub mod validation;

pub use errors::CheckoutError;
pub use models::*;
pub use service::CheckoutService;
pub use validation::{CheckoutField, ValidationErrors};
