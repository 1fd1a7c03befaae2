//! Configuration
//!
//! Settings are read from CLI flags, falling back to environment variables (a
//! `.env` file is loaded by the binary first).

use thiserror::Error;

use crate::pricing::PricingError;

pub mod api;
pub mod geolocation;
pub mod observability;
pub mod pricing;
pub mod session;

pub use api::ApiConfig;
pub use geolocation::GeolocationConfig;
pub use observability::{LogFormat, LoggingConfig};
pub use pricing::PricingConfig;
pub use session::SessionConfig;

/// Errors raised while turning settings into runtime values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The pricing settings or pricing file were invalid.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Every setting shared by the `chopnow` commands.
#[derive(Debug, clap::Args)]
pub struct ChopnowConfig {
    /// Backend API settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Pricing settings.
    #[command(flatten)]
    pub pricing: PricingConfig,

    /// Session storage settings.
    #[command(flatten)]
    pub session: SessionConfig,

    /// Geolocation settings.
    #[command(flatten)]
    pub geolocation: GeolocationConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
