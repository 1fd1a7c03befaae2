//! Cart

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    menu::{Customizations, MenuItemRef, negative_price, unit_price},
    pricing::{TotalPriceError, currency_from_code, total_price},
};

/// Errors related to cart construction or mutation.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    /// A menu price or surcharge was negative (menu item, amount).
    #[error("menu item {0} has a negative price: {1}")]
    NegativePrice(i64, i64),

    /// Item price overflowed while applying customizations or quantity.
    #[error("price overflowed for menu item {0}")]
    PriceOverflow(i64),

    /// The item belongs to a different restaurant than the cart (item restaurant, cart restaurant).
    #[error("cart holds items from restaurant {1}, cannot add items from restaurant {0}")]
    RestaurantConflict(i64, i64),

    /// An item was not found in the cart.
    #[error("item {0} not found")]
    ItemNotFound(String),

    /// Stored cart uses a currency this crate does not support.
    #[error("unsupported cart currency: {0}")]
    UnknownCurrency(String),
}

/// Which restaurant an item was ordered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRef {
    /// Backend restaurant id
    pub id: i64,

    /// Display name
    pub name: String,

    /// URL slug used to fetch the restaurant
    pub slug: String,
}

/// What to do when an item from another restaurant is added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartConflictPolicy {
    /// Refuse the item and leave the cart untouched.
    #[default]
    Reject,

    /// Empty the cart, then add the item.
    Replace,
}

/// A line in the cart.
///
/// `total_price` is fixed when the item is created from the menu price and
/// customizations at that moment. Later menu price changes do not affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    id: String,
    menu_item: MenuItemRef,
    quantity: u32,
    #[serde(default)]
    customizations: Customizations,
    unit_price: i64,
    total_price: i64,
    restaurant_id: i64,
    restaurant_name: String,
    restaurant_slug: String,
}

impl CartItem {
    /// Creates a cart line, snapshotting its price.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`]: quantity is zero.
    /// - [`CartError::NegativePrice`]: the base price or a surcharge is below zero.
    /// - [`CartError::PriceOverflow`]: the price does not fit in minor units.
    pub fn new(
        menu_item: MenuItemRef,
        quantity: u32,
        customizations: Customizations,
        restaurant: RestaurantRef,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        if let Some(price) = negative_price(&menu_item, &customizations) {
            return Err(CartError::NegativePrice(menu_item.id, price));
        }

        let unit_price =
            unit_price(&menu_item, &customizations).ok_or(CartError::PriceOverflow(menu_item.id))?;

        let total_price = line_total(unit_price, quantity, menu_item.id)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            menu_item,
            quantity,
            customizations,
            unit_price,
            total_price,
            restaurant_id: restaurant.id,
            restaurant_name: restaurant.name,
            restaurant_slug: restaurant.slug,
        })
    }

    /// Cart line id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Menu item as it was when added
    pub fn menu_item(&self) -> &MenuItemRef {
        &self.menu_item
    }

    /// Quantity ordered
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Selected customizations
    pub fn customizations(&self) -> &Customizations {
        &self.customizations
    }

    /// Price of one unit including customizations, in minor units
    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    /// Price of the whole line in minor units
    pub fn total_price(&self) -> i64 {
        self.total_price
    }

    /// Restaurant the item was ordered from
    pub fn restaurant(&self) -> RestaurantRef {
        RestaurantRef {
            id: self.restaurant_id,
            name: self.restaurant_name.clone(),
            slug: self.restaurant_slug.clone(),
        }
    }

    /// Restaurant id
    pub fn restaurant_id(&self) -> i64 {
        self.restaurant_id
    }

    fn set_quantity(&mut self, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        self.total_price = line_total(self.unit_price, quantity, self.menu_item.id)?;
        self.quantity = quantity;

        Ok(())
    }
}

fn line_total(unit_price: i64, quantity: u32, menu_item: i64) -> Result<i64, CartError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or(CartError::PriceOverflow(menu_item))
}

/// The customer's cart. Every item belongs to the same restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CartRecord", into = "CartRecord")]
pub struct Cart {
    items: Vec<CartItem>,
    currency: &'static Currency,
}

impl Cart {
    /// Create a new, empty cart.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
        }
    }

    /// Add an item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::RestaurantConflict`] if the cart holds items from another
    /// restaurant and the policy is [`CartConflictPolicy::Reject`].
    pub fn add_item(&mut self, item: CartItem, policy: CartConflictPolicy) -> Result<(), CartError> {
        match (self.restaurant_id(), policy) {
            (Some(current), CartConflictPolicy::Reject) if current != item.restaurant_id => {
                return Err(CartError::RestaurantConflict(item.restaurant_id, current));
            }
            (Some(current), CartConflictPolicy::Replace) if current != item.restaurant_id => {
                debug!(
                    from = current,
                    to = item.restaurant_id,
                    "replacing cart contents with another restaurant"
                );
                self.clear();
            }
            _ => {}
        }

        self.items.push(item);

        Ok(())
    }

    /// Remove an item by id.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if no item has that id.
    pub fn remove_item(&mut self, id: &str) -> Result<CartItem, CartError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))?;

        Ok(self.items.remove(position))
    }

    /// Change an item's quantity, recomputing its line total from the stored unit price.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown id, or
    /// [`CartError::InvalidQuantity`] for a zero quantity.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) -> Result<(), CartError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))?
            .set_quantity(quantity)
    }

    /// Remove every item. Clearing an empty cart does nothing.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a `TotalPriceError` if there was a money arithmetic error.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, TotalPriceError> {
        if self.is_empty() {
            return Ok(Money::from_minor(0, self.currency));
        }

        total_price(&self.items, self.currency)
    }

    /// Restaurant id shared by the cart's items.
    pub fn restaurant_id(&self) -> Option<i64> {
        self.items.first().map(CartItem::restaurant_id)
    }

    /// Restaurant shared by the cart's items.
    pub fn restaurant(&self) -> Option<RestaurantRef> {
        self.items.first().map(CartItem::restaurant)
    }

    /// Get an item by id.
    pub fn get_item(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Iterate over the items in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Get the number of lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Serialized form of a [`Cart`].
#[derive(Debug, Serialize, Deserialize)]
struct CartRecord {
    currency: String,
    items: Vec<CartItem>,
}

impl From<Cart> for CartRecord {
    fn from(cart: Cart) -> Self {
        Self {
            currency: cart.currency.iso_alpha_code.to_string(),
            items: cart.items,
        }
    }
}

impl TryFrom<CartRecord> for Cart {
    type Error = CartError;

    fn try_from(record: CartRecord) -> Result<Self, Self::Error> {
        let currency = currency_from_code(&record.currency)
            .map_err(|_err| CartError::UnknownCurrency(record.currency.clone()))?;

        // Stored data goes through the same single restaurant check as new items.
        let mut cart = Cart::new(currency);
        for item in record.items {
            cart.add_item(item, CartConflictPolicy::Reject)?;
        }

        Ok(cart)
    }
}
