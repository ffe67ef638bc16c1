//! Errors raised while assembling an integration

use tether_auth::OAuthError;
use tether_config::ConfigError;
use tether_http_client::HttpClientError;
use thiserror::Error;

/// Construction-time failure; runtime operations report through
/// [`IntegrationResult`](crate::IntegrationResult) instead.
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Invalid integration configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid OAuth setup: {0}")]
    OAuth(#[from] OAuthError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] HttpClientError),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
