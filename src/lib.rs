//! ChopNow
//!
//! Delivery pricing and checkout for the ChopNow food-delivery marketplace: the
//! haversine distance between customer and restaurant, the distance-based
//! delivery fee, the persisted cart and session, and the checkout pipeline that
//! prices the cart and submits the order.

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod fees;
pub mod geo;
pub mod geolocation;
pub mod menu;
pub mod observability;
pub mod orders;
pub mod payments;
pub mod prelude;
pub mod pricing;
pub mod restaurants;
pub mod session;
pub mod summary;
