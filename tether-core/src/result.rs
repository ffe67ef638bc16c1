//! The uniform result envelope

use serde::{Deserialize, Serialize};

/// Error codes carried in [`ErrorInfo::code`].
pub mod codes {
    /// Payload failed signature, shape or allow-list validation
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

    /// No event name could be classified from headers or body
    pub const NO_EVENT_TYPE: &str = "NO_EVENT_TYPE";

    /// No handler registered for the event and no catch-all handler
    pub const NO_HANDLER: &str = "NO_HANDLER";

    /// A handler raised an error
    pub const PROCESSING_ERROR: &str = "PROCESSING_ERROR";

    /// Retry requested for an unknown delivery
    pub const DELIVERY_NOT_FOUND: &str = "DELIVERY_NOT_FOUND";

    /// Retry budget for a delivery is used up
    pub const MAX_RETRIES_EXCEEDED: &str = "MAX_RETRIES_EXCEEDED";

    /// Retry requested for a delivery that already succeeded
    pub const ALREADY_DELIVERED: &str = "ALREADY_DELIVERED";

    /// No webhook configuration registered for the integration
    pub const NO_CONFIG: &str = "NO_CONFIG";

    /// The integration has no OAuth configuration
    pub const NO_OAUTH_CONFIG: &str = "NO_OAUTH_CONFIG";

    /// Building the authorization URL failed
    pub const OAUTH_INIT_FAILED: &str = "OAUTH_INIT_FAILED";

    /// Exchanging the authorization code failed
    pub const OAUTH_EXCHANGE_FAILED: &str = "OAUTH_EXCHANGE_FAILED";

    /// Refreshing tokens failed
    pub const TOKEN_REFRESH_FAILED: &str = "TOKEN_REFRESH_FAILED";

    /// Revoking tokens failed
    pub const TOKEN_REVOKE_FAILED: &str = "TOKEN_REVOKE_FAILED";

    /// Fetching the authorized user's identity failed
    pub const USER_INFO_FAILED: &str = "USER_INFO_FAILED";

    /// Integration setup is invalid
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
}

/// Error details of a failed [`IntegrationResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine readable code, usually one of [`codes`]
    pub code: String,

    /// Human readable message
    pub message: String,

    /// Optional structured details, e.g. the underlying cause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Whether repeating the operation may succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorInfo {
    /// Create a new error with the given code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: None,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark the error as retryable or not
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

/// Outcome envelope returned by every public operation.
///
/// Serializes to `{"success": .., "data"?: .., "error"?: .., "shouldRetry"?: ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResult<T = serde_json::Value> {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_retry: Option<bool>,
}

impl<T> IntegrationResult<T> {
    /// Successful result carrying data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            should_retry: None,
        }
    }

    /// Successful result without data
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            should_retry: None,
        }
    }

    /// Failed result
    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            should_retry: None,
        }
    }

    /// Failed result built from a code and message
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::failure(ErrorInfo::new(code, message))
    }

    /// Set the retry hint
    pub fn with_should_retry(mut self, should_retry: bool) -> Self {
        self.should_retry = Some(should_retry);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Code of the error, if any
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    /// Message of the error, if any
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Whether the result explicitly forbids another attempt
    pub fn disallows_retry(&self) -> bool {
        self.should_retry == Some(false)
            || self.error.as_ref().and_then(|e| e.retryable) == Some(false)
    }

    /// Transform the carried data
    pub fn map<U, F>(self, f: F) -> IntegrationResult<U>
    where
        F: FnOnce(T) -> U,
    {
        IntegrationResult {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            should_retry: self.should_retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_result() {
        let result = IntegrationResult::ok(json!({"id": 1}));
        assert!(result.is_success());
        assert!(result.error.is_none());
        assert_eq!(result.data, Some(json!({"id": 1})));
    }

    #[test]
    fn test_failure_result() {
        let result: IntegrationResult =
            IntegrationResult::failure(ErrorInfo::new(codes::NO_HANDLER, "no handler").retryable(false));
        assert!(!result.is_success());
        assert_eq!(result.error_code(), Some("NO_HANDLER"));
        assert_eq!(result.error_message(), Some("no handler"));
        assert!(result.disallows_retry());
    }

    #[test]
    fn test_disallows_retry() {
        let retryable: IntegrationResult =
            IntegrationResult::fail(codes::PROCESSING_ERROR, "boom").with_should_retry(true);
        assert!(!retryable.disallows_retry());

        let silent: IntegrationResult = IntegrationResult::fail("CUSTOM", "no hint");
        assert!(!silent.disallows_retry());

        let stop: IntegrationResult = IntegrationResult::fail("CUSTOM", "stop").with_should_retry(false);
        assert!(stop.disallows_retry());
    }

    #[test]
    fn test_envelope_serialization() {
        let result: IntegrationResult = IntegrationResult::failure(
            ErrorInfo::new(codes::PROCESSING_ERROR, "boom").retryable(true),
        )
        .with_should_retry(true);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": {"code": "PROCESSING_ERROR", "message": "boom", "retryable": true},
                "shouldRetry": true
            })
        );
    }

    #[test]
    fn test_map() {
        let result = IntegrationResult::ok(2).map(|v| v * 10);
        assert_eq!(result.data, Some(20));
    }
}
