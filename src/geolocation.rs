//! Geolocation
//!
//! Obtaining the customer's position and turning coordinates into an address.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    geo::Coordinate,
    session::{Session, SessionError, SessionStorage},
};

/// Errors from positioning or reverse geocoding.
#[derive(Debug, Error)]
pub enum GeolocationError {
    /// The customer declined location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// No position could be determined.
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// The position request did not resolve in time.
    #[error("position request timed out after {0:?}")]
    Timeout(Duration),

    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The geocoding service returned a non-2xx response or unexpected body.
    #[error("unexpected response from geocoder: {0}")]
    UnexpectedResponse(String),
}

/// Source of the customer's current position.
#[automock]
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Resolve the current position.
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// Turns coordinates into a human-readable address.
#[automock]
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Look up the address closest to `coordinate`.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeolocationError>;
}

/// A geolocator that always reports the same answer.
///
/// `None` behaves like a customer who declined location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedGeolocator {
    position: Option<Coordinate>,
}

impl FixedGeolocator {
    /// Creates a geolocator for a known position, or a denied one for `None`.
    #[must_use]
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        self.position.ok_or(GeolocationError::PermissionDenied)
    }
}

/// Ask `geolocator` for a position, giving up after `timeout` when one is set.
///
/// # Errors
///
/// Returns [`GeolocationError::Timeout`] if the timeout elapses, otherwise whatever the
/// geolocator reports.
pub async fn locate(
    geolocator: &dyn Geolocator,
    timeout: Option<Duration>,
) -> Result<Coordinate, GeolocationError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, geolocator.current_position())
            .await
            .map_err(|_elapsed| GeolocationError::Timeout(limit))?,
        None => geolocator.current_position().await,
    }
}

/// Locate the customer and store the position in the session.
///
/// Positioning failures are not errors: they are logged and `None` is returned, so
/// checkout falls back to the flat delivery fee.
///
/// # Errors
///
/// Returns a [`SessionError`] only if the new position cannot be persisted.
pub async fn capture_location<S: SessionStorage>(
    session: &mut Session<S>,
    geolocator: &dyn Geolocator,
    timeout: Option<Duration>,
) -> Result<Option<Coordinate>, SessionError> {
    match locate(geolocator, timeout).await {
        Ok(position) => {
            session.set_location(position)?;
            debug!(%position, "captured customer location");
            Ok(Some(position))
        }
        Err(err) => {
            warn!("could not determine customer location: {err}");
            Ok(None)
        }
    }
}

/// Connection settings for a Nominatim-compatible reverse geocoder.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Service address, e.g. `"https://nominatim.openstreetmap.org"`.
    pub base_url: String,

    /// `User-Agent` sent with every request, as the service requires.
    pub user_agent: String,
}

/// HTTP reverse geocoder speaking the Nominatim `/reverse` API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    config: NominatimConfig,
    http: Client,
}

impl NominatimGeocoder {
    /// Create a new geocoder from the given configuration.
    #[must_use]
    pub fn new(config: NominatimConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn reverse_url(&self) -> String {
        format!("{}/reverse", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeolocationError> {
        let response = self
            .http
            .get(self.reverse_url())
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(GeolocationError::UnexpectedResponse(format!(
                "reverse request failed with status {status}: {text}"
            )));
        }

        let parsed: ReverseResponse = response.json().await?;

        address_from(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

fn address_from(response: ReverseResponse) -> Result<String, GeolocationError> {
    match response {
        ReverseResponse {
            display_name: Some(address),
            ..
        } if !address.trim().is_empty() => Ok(address),
        ReverseResponse {
            error: Some(error), ..
        } => Err(GeolocationError::UnexpectedResponse(error)),
        ReverseResponse { .. } => Err(GeolocationError::UnexpectedResponse(
            "response had no address".to_string(),
        )),
    }
}
