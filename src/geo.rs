//! Geo

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors produced when building or parsing a coordinate.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    /// Latitude is not finite or lies outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    /// Longitude is not finite or lies outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    /// Input was not in the `lat,lng` format.
    #[error("expected 'LAT,LNG', got: {0}")]
    Parse(String),
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate without range checks.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Creates a coordinate, rejecting out-of-range or non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::Latitude`] or [`CoordinateError::Longitude`] when a
    /// component is outside its valid range.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }

        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }

        Ok(Self::new(latitude, longitude))
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_km(*self, *other)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| CoordinateError::Parse(s.to_string()))?;

        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|_err| CoordinateError::Parse(s.to_string()))?;

        let longitude = lng
            .trim()
            .parse::<f64>()
            .map_err(|_err| CoordinateError::Parse(s.to_string()))?;

        Self::try_new(latitude, longitude)
    }
}

/// Haversine distance between two coordinates in kilometres.
///
/// Inputs are not validated and the result is not rounded.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Rounds a distance to one decimal place for display.
///
/// Returns `None` for non-finite distances.
pub fn round_km(distance: f64) -> Option<Decimal> {
    Decimal::from_f64(distance)
        .map(|d| d.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}
