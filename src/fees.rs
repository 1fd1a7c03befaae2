//! Delivery fees

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while calculating a delivery fee.
#[derive(Debug, Error, PartialEq)]
pub enum FeeError {
    /// Distance was negative, NaN or infinite.
    #[error("invalid delivery distance: {0} km")]
    InvalidDistance(f64),

    /// Distance could not be represented as a decimal, or the fee overflowed.
    #[error("delivery fee for {0} km could not be represented")]
    Conversion(f64),

    /// A policy amount was negative.
    #[error("delivery fee {name} must not be negative, got {value}")]
    NegativeAmount {
        /// Policy field name
        name: &'static str,

        /// Rejected value
        value: Decimal,
    },

    /// The lower bound exceeds the upper bound.
    #[error("minimum delivery fee {minimum} exceeds maximum {maximum}")]
    InvertedBounds {
        /// Configured minimum
        minimum: Decimal,

        /// Configured maximum
        maximum: Decimal,
    },
}

/// Maps a delivery distance to a fee.
///
/// The fee is `distance_km * per_km`, or `fallback` when no distance is known.
/// `minimum` and `maximum` are unset by default, so the fee is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFeePolicy {
    /// Fee charged per kilometre
    pub per_km: Decimal,

    /// Flat fee used when the distance cannot be computed
    pub fallback: Decimal,

    /// Optional lower bound applied to distance-based fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Decimal>,

    /// Optional upper bound applied to distance-based fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Decimal>,
}

impl DeliveryFeePolicy {
    /// £0.50 per kilometre.
    pub const DEFAULT_PER_KM: Decimal = Decimal::from_parts(50, 0, 0, false, 2);

    /// £2.50 when no distance is available.
    pub const DEFAULT_FALLBACK: Decimal = Decimal::from_parts(250, 0, 0, false, 2);

    /// Creates an unbounded linear policy.
    #[must_use]
    pub fn new(per_km: Decimal, fallback: Decimal) -> Self {
        Self {
            per_km,
            fallback,
            minimum: None,
            maximum: None,
        }
    }

    /// Sets a lower bound for distance-based fees.
    #[must_use]
    pub fn with_minimum(mut self, minimum: Decimal) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Sets an upper bound for distance-based fees.
    #[must_use]
    pub fn with_maximum(mut self, maximum: Decimal) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Checks that every amount is non-negative and the bounds are ordered.
    ///
    /// # Errors
    ///
    /// - [`FeeError::NegativeAmount`]: a rate, fallback or bound is below zero.
    /// - [`FeeError::InvertedBounds`]: `minimum` is greater than `maximum`.
    pub fn validate(&self) -> Result<(), FeeError> {
        let amounts = [
            ("per_km", Some(self.per_km)),
            ("fallback", Some(self.fallback)),
            ("minimum", self.minimum),
            ("maximum", self.maximum),
        ];

        for (name, value) in amounts {
            if let Some(value) = value
                && value < Decimal::ZERO
            {
                return Err(FeeError::NegativeAmount { name, value });
            }
        }

        if let (Some(minimum), Some(maximum)) = (self.minimum, self.maximum)
            && minimum > maximum
        {
            return Err(FeeError::InvertedBounds { minimum, maximum });
        }

        Ok(())
    }

    /// Calculates the fee for a distance in kilometres.
    ///
    /// The result is not rounded; callers round for display.
    ///
    /// # Errors
    ///
    /// - [`FeeError::InvalidDistance`]: the distance is negative or not finite.
    /// - [`FeeError::Conversion`]: the distance or fee cannot be represented as a decimal.
    pub fn fee(&self, distance_km: Option<f64>) -> Result<Decimal, FeeError> {
        let Some(distance) = distance_km else {
            return Ok(self.fallback);
        };

        if !distance.is_finite() || distance < 0.0 {
            return Err(FeeError::InvalidDistance(distance));
        }

        let fee = Decimal::from_f64_retain(distance)
            .and_then(|km| km.checked_mul(self.per_km))
            .ok_or(FeeError::Conversion(distance))?;

        let fee = self.minimum.map_or(fee, |min| fee.max(min));
        let fee = self.maximum.map_or(fee, |max| fee.min(max));

        Ok(fee)
    }
}

impl Default for DeliveryFeePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PER_KM, Self::DEFAULT_FALLBACK)
    }
}

/// Calculates the delivery fee under the default policy.
///
/// # Errors
///
/// See [`DeliveryFeePolicy::fee`].
pub fn delivery_fee(distance_km: Option<f64>) -> Result<Decimal, FeeError> {
    DeliveryFeePolicy::default().fee(distance_km)
}
