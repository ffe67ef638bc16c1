//! Error types for webhook operations

use thiserror::Error;

/// Errors that can occur while configuring webhook processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// Signature method name is not supported
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
