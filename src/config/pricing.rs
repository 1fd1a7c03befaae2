//! Pricing Config

use std::path::PathBuf;

use clap::Args;
use rust_decimal::Decimal;

use crate::{
    config::ConfigError,
    fees::DeliveryFeePolicy,
    pricing::{PricingPolicy, currency_from_code},
};

/// Pricing settings.
///
/// A pricing file, when given, replaces every other pricing setting.
#[derive(Debug, Clone, Args)]
pub struct PricingConfig {
    /// ISO currency code (GBP, EUR, USD)
    #[arg(long, env = "CHOPNOW_CURRENCY", default_value = "GBP")]
    pub currency: String,

    /// Delivery fee per kilometre
    #[arg(long, env = "CHOPNOW_FEE_PER_KM", default_value = "0.50")]
    pub fee_per_km: Decimal,

    /// Delivery fee when the distance is unknown
    #[arg(long, env = "CHOPNOW_FALLBACK_FEE", default_value = "2.50")]
    pub fallback_fee: Decimal,

    /// Lowest distance-based delivery fee
    #[arg(long, env = "CHOPNOW_MIN_FEE")]
    pub min_fee: Option<Decimal>,

    /// Highest distance-based delivery fee
    #[arg(long, env = "CHOPNOW_MAX_FEE")]
    pub max_fee: Option<Decimal>,

    /// Platform fee as a fraction of the subtotal
    #[arg(long, env = "CHOPNOW_PLATFORM_FEE_RATE", default_value = "0.15")]
    pub platform_fee_rate: Decimal,

    /// YAML pricing policy file
    #[arg(long, env = "CHOPNOW_PRICING_FILE")]
    pub pricing_file: Option<PathBuf>,
}

impl PricingConfig {
    /// Build the pricing policy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is out of range or the pricing file is invalid.
    pub fn policy(&self) -> Result<PricingPolicy, ConfigError> {
        if let Some(path) = &self.pricing_file {
            return Ok(PricingPolicy::from_yaml_file(path)?);
        }

        let mut delivery = DeliveryFeePolicy::new(self.fee_per_km, self.fallback_fee);

        if let Some(minimum) = self.min_fee {
            delivery = delivery.with_minimum(minimum);
        }

        if let Some(maximum) = self.max_fee {
            delivery = delivery.with_maximum(maximum);
        }

        Ok(PricingPolicy::new(
            currency_from_code(&self.currency)?,
            delivery,
            self.platform_fee_rate,
        )?)
    }
}
