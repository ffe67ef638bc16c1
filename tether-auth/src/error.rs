//! Error types for OAuth flows

use serde_json::json;
use tether_core::{ErrorInfo, codes};
use tether_http_client::HttpClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    /// Provider setup is unusable; retrying cannot help
    #[error("OAuth configuration error: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpClientError),

    /// The platform reported a failure inside a successful HTTP response
    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl OAuthError {
    /// Network and platform failures may succeed when the step is repeated
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Configuration(_) | Self::InvalidUrl(_))
    }

    /// Result-envelope code for this error when raised by `operation_code`
    pub fn code<'a>(&self, operation_code: &'a str) -> &'a str {
        match self {
            Self::Configuration(_) | Self::InvalidUrl(_) => codes::CONFIGURATION_ERROR,
            _ => operation_code,
        }
    }

    /// Convert into envelope error details carrying the original cause
    pub fn to_error_info(&self, operation_code: &str, message: &str) -> ErrorInfo {
        ErrorInfo::new(self.code(operation_code), message)
            .with_details(json!({ "cause": self.to_string() }))
            .retryable(self.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, OAuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err = OAuthError::Configuration("custom provider requires token_url".into());
        assert!(!err.is_retryable());
        assert_eq!(err.code(codes::OAUTH_EXCHANGE_FAILED), codes::CONFIGURATION_ERROR);
    }

    #[test]
    fn test_platform_errors_are_retryable() {
        let err = OAuthError::Platform("invalid_code".into());
        assert!(err.is_retryable());

        let info = err.to_error_info(codes::OAUTH_EXCHANGE_FAILED, "Failed to complete OAuth");
        assert_eq!(info.code, codes::OAUTH_EXCHANGE_FAILED);
        assert_eq!(info.retryable, Some(true));
        assert_eq!(info.details.unwrap()["cause"], "Platform error: invalid_code");
    }
}
