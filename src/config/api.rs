//! API Config

use clap::Args;

use crate::api::ApiClientConfig;

/// Backend API settings.
#[derive(Debug, Clone, Args)]
pub struct ApiConfig {
    /// Backend base URL
    #[arg(long, env = "CHOPNOW_API_URL", default_value = "http://localhost:8080/api")]
    pub api_url: String,

    /// Bearer token for authenticated calls
    #[arg(long, env = "CHOPNOW_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

impl ApiConfig {
    /// Connection settings for [`crate::api::ApiClient`].
    #[must_use]
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
        }
    }
}
