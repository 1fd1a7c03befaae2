//! Menu items and customizations

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A menu item as returned by the restaurant API, priced in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRef {
    /// Backend menu item id
    pub id: i64,

    /// Display name
    pub name: String,

    /// Base price in minor units (pence)
    pub price: i64,
}

/// A single customization option with its surcharge in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    /// Option name, e.g. "Extra cheese"
    pub name: String,

    /// Surcharge in minor units
    #[serde(default)]
    pub price: i64,
}

impl Customization {
    /// Creates a new customization.
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// The selection made for one option group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomizationChoice {
    /// A single-choice group, e.g. size
    Single(Customization),

    /// A multi-choice group, e.g. toppings
    Multiple(Vec<Customization>),
}

impl CustomizationChoice {
    /// Every option chosen in this group.
    pub fn options(&self) -> &[Customization] {
        match self {
            CustomizationChoice::Single(choice) => std::slice::from_ref(choice),
            CustomizationChoice::Multiple(choices) => choices,
        }
    }

    /// Sum of surcharges in this selection, or `None` on overflow.
    pub fn surcharge(&self) -> Option<i64> {
        match self {
            CustomizationChoice::Single(choice) => Some(choice.price),
            CustomizationChoice::Multiple(choices) => choices
                .iter()
                .try_fold(0i64, |acc, choice| acc.checked_add(choice.price)),
        }
    }
}

/// Customization selections keyed by option group name.
pub type Customizations = FxHashMap<String, CustomizationChoice>;

/// First negative amount among the base price and the surcharges, if any.
pub fn negative_price(menu_item: &MenuItemRef, customizations: &Customizations) -> Option<i64> {
    std::iter::once(menu_item.price)
        .chain(
            customizations
                .values()
                .flat_map(CustomizationChoice::options)
                .map(|option| option.price),
        )
        .find(|price| *price < 0)
}

/// Price of one unit: base price plus every surcharge. `None` on overflow.
pub fn unit_price(menu_item: &MenuItemRef, customizations: &Customizations) -> Option<i64> {
    customizations
        .values()
        .try_fold(menu_item.price, |acc, choice| acc.checked_add(choice.surcharge()?))
}
