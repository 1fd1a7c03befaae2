//! Pricing
//!
//! Money helpers, the checkout totals breakdown and the pricing policy that
//! ties the delivery fee and platform fee together.
//!
//! Amounts are carried as minor units (`i64`) in stored data and as exact
//! [`Decimal`] values while totals are assembled. Rounding to the currency's
//! two decimal places only happens when a total is turned back into [`Money`].

use std::{fs, path::Path};

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money, MoneyError,
    iso::{self, Currency},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::CartItem,
    fees::{DeliveryFeePolicy, FeeError},
};

/// Errors that can occur while calculating totals.
#[derive(Debug, Error, PartialEq)]
pub enum TotalPriceError {
    /// No items were provided, so there is nothing to total.
    #[error("no items provided; cannot calculate a total")]
    NoItems,

    /// A decimal amount overflowed or could not be converted to minor units.
    #[error("amount overflowed while calculating totals")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Errors that can occur while building a pricing policy.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Platform fee rate must be a fraction in `[0, 1]`
    #[error("Invalid platform fee rate: {0}")]
    InvalidRate(Decimal),

    /// IO error reading a policy file
    #[error("Failed to read pricing file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse pricing YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Delivery fee error
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// Totals error
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// Resolve a supported ISO currency code.
///
/// # Errors
///
/// Returns [`PricingError::UnknownCurrency`] for codes other than GBP, EUR and USD.
pub fn currency_from_code(code: &str) -> Result<&'static Currency, PricingError> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Ok(iso::GBP),
        "EUR" => Ok(iso::EUR),
        "USD" => Ok(iso::USD),
        other => Err(PricingError::UnknownCurrency(other.to_string())),
    }
}

/// Minor units (pence/cents) as a decimal amount.
pub fn minor_to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Round a decimal amount to two places, midpoint away from zero.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a decimal amount into [`Money`].
///
/// # Errors
///
/// Returns [`TotalPriceError::Overflow`] if the amount does not fit in `i64` minor units.
pub fn decimal_to_money(
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, TotalPriceError> {
    let minor = round_amount(amount)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.to_i64())
        .ok_or(TotalPriceError::Overflow)?;

    Ok(Money::from_minor(minor, currency))
}

/// Calculates the total price of a list of cart items.
///
/// # Errors
///
/// - [`TotalPriceError::NoItems`]: No items were provided.
/// - [`TotalPriceError::Money`]: Wrapped money arithmetic error.
pub fn total_price(
    items: &[CartItem],
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, TotalPriceError> {
    if items.is_empty() {
        return Err(TotalPriceError::NoItems);
    }

    let total = items.iter().try_fold(Money::from_minor(0, currency), |acc, item| {
        acc.add(Money::from_minor(item.total_price(), currency))
    })?;

    Ok(total)
}

/// Breakdown of an order's cost.
///
/// `platform_fee = subtotal * platform_fee_rate` and
/// `grand_total = subtotal + platform_fee + delivery_fee`, both exact.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutTotals {
    subtotal: Decimal,
    platform_fee_rate: Decimal,
    platform_fee: Decimal,
    delivery_fee: Decimal,
    grand_total: Decimal,
    currency: &'static Currency,
}

impl CheckoutTotals {
    /// Assemble totals from a subtotal, a delivery fee and a platform fee rate.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if an intermediate sum overflows.
    pub fn new(
        subtotal: Money<'static, Currency>,
        delivery_fee: Decimal,
        platform_fee_rate: Decimal,
    ) -> Result<Self, TotalPriceError> {
        let currency = subtotal.currency();
        let subtotal = minor_to_decimal(subtotal.to_minor_units());

        let platform_fee = Percentage::from(platform_fee_rate) * subtotal;

        let grand_total = subtotal
            .checked_add(platform_fee)
            .and_then(|sum| sum.checked_add(delivery_fee))
            .ok_or(TotalPriceError::Overflow)?;

        Ok(Self {
            subtotal,
            platform_fee_rate,
            platform_fee,
            delivery_fee,
            grand_total,
            currency,
        })
    }

    /// Sum of cart item prices
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Fraction of the subtotal charged as platform fee
    pub fn platform_fee_rate(&self) -> Decimal {
        self.platform_fee_rate
    }

    /// Platform fee, unrounded
    pub fn platform_fee(&self) -> Decimal {
        self.platform_fee
    }

    /// Delivery fee, unrounded
    pub fn delivery_fee(&self) -> Decimal {
        self.delivery_fee
    }

    /// Grand total, unrounded
    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }

    /// Currency of every amount
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Grand total rounded into money for display or charging.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if the amount does not fit in minor units.
    pub fn grand_total_money(&self) -> Result<Money<'static, Currency>, TotalPriceError> {
        decimal_to_money(self.grand_total, self.currency)
    }

    /// Every amount rounded into money, in display order.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if an amount does not fit in minor units.
    pub fn lines(&self) -> Result<[(&'static str, Money<'static, Currency>); 4], TotalPriceError> {
        Ok([
            ("Subtotal", decimal_to_money(self.subtotal, self.currency)?),
            ("Platform fee", decimal_to_money(self.platform_fee, self.currency)?),
            ("Delivery fee", decimal_to_money(self.delivery_fee, self.currency)?),
            ("Total", self.grand_total_money()?),
        ])
    }
}

/// Currency, delivery fee policy and platform fee rate used at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    /// Currency for every amount
    pub currency: &'static Currency,

    /// Distance-based delivery fee policy
    pub delivery: DeliveryFeePolicy,

    /// Platform fee as a fraction of the subtotal
    pub platform_fee_rate: Decimal,
}

impl PricingPolicy {
    /// 15% of the food subtotal.
    pub const DEFAULT_PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

    /// Creates a policy, validating the delivery fee policy and the platform fee rate.
    ///
    /// # Errors
    ///
    /// - [`PricingError::Fee`]: a delivery amount is negative or the bounds are inverted.
    /// - [`PricingError::InvalidRate`]: the rate lies outside `[0, 1]`.
    pub fn new(
        currency: &'static Currency,
        delivery: DeliveryFeePolicy,
        platform_fee_rate: Decimal,
    ) -> Result<Self, PricingError> {
        delivery.validate()?;

        if platform_fee_rate < Decimal::ZERO || platform_fee_rate > Decimal::ONE {
            return Err(PricingError::InvalidRate(platform_fee_rate));
        }

        Ok(Self {
            currency,
            delivery,
            platform_fee_rate,
        })
    }

    /// Parse a policy from YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the YAML is malformed or contains invalid values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PricingError> {
        let file: PricingPolicyFile = serde_norway::from_str(yaml)?;

        Self::new(
            currency_from_code(&file.currency)?,
            file.delivery,
            file.platform_fee_rate,
        )
    }

    /// Load a policy from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PricingError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Compute totals for a subtotal and an optional delivery distance.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the fee or totals cannot be calculated.
    pub fn totals(
        &self,
        subtotal: Money<'static, Currency>,
        distance_km: Option<f64>,
    ) -> Result<CheckoutTotals, PricingError> {
        let delivery_fee = self.delivery.fee(distance_km)?;

        Ok(CheckoutTotals::new(
            subtotal,
            delivery_fee,
            self.platform_fee_rate,
        )?)
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: iso::GBP,
            delivery: DeliveryFeePolicy::default(),
            platform_fee_rate: Self::DEFAULT_PLATFORM_FEE_RATE,
        }
    }
}

/// YAML shape of a pricing policy.
#[derive(Debug, Deserialize)]
struct PricingPolicyFile {
    #[serde(default = "default_currency_code")]
    currency: String,

    #[serde(default)]
    delivery: DeliveryFeePolicy,

    #[serde(default = "default_platform_fee_rate")]
    platform_fee_rate: Decimal,
}

fn default_currency_code() -> String {
    iso::GBP.iso_alpha_code.to_string()
}

fn default_platform_fee_rate() -> Decimal {
    PricingPolicy::DEFAULT_PLATFORM_FEE_RATE
}
