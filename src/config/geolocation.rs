//! Geolocation Config

use std::time::Duration;

use clap::Args;

use crate::{
    geo::Coordinate,
    geolocation::{FixedGeolocator, NominatimConfig},
};

/// Geolocation settings.
#[derive(Debug, Clone, Args)]
pub struct GeolocationConfig {
    /// Customer position as "lat,lng"; when unset, location access is treated as denied
    #[arg(long, env = "CHOPNOW_LOCATION", allow_hyphen_values = true)]
    pub location: Option<Coordinate>,

    /// Seconds to wait for a position before giving up
    #[arg(long, env = "CHOPNOW_GEOLOCATION_TIMEOUT_SECS")]
    pub geolocation_timeout_secs: Option<u64>,

    /// Reverse geocoding service URL
    #[arg(
        long,
        env = "CHOPNOW_GEOCODER_URL",
        default_value = "https://nominatim.openstreetmap.org"
    )]
    pub geocoder_url: String,

    /// `User-Agent` sent to the reverse geocoding service
    #[arg(long, env = "CHOPNOW_GEOCODER_USER_AGENT", default_value = "chopnow-cli")]
    pub geocoder_user_agent: String,
}

impl GeolocationConfig {
    /// Geolocator reporting the configured position.
    #[must_use]
    pub fn geolocator(&self) -> FixedGeolocator {
        FixedGeolocator::new(self.location)
    }

    /// Configured position timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.geolocation_timeout_secs.map(Duration::from_secs)
    }

    /// Reverse geocoder connection settings.
    #[must_use]
    pub fn nominatim(&self) -> NominatimConfig {
        NominatimConfig {
            base_url: self.geocoder_url.clone(),
            user_agent: self.geocoder_user_agent.clone(),
        }
    }
}
