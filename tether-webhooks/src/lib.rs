//! Inbound webhooks for Tether
//!
//! This crate receives webhooks from third-party platforms, verifies them and
//! dispatches them to application handlers.
//!
//! # Features
//!
//! - **Signature Verification**: HMAC-SHA256 and HMAC-SHA1 in the
//!   `<algo>=<hex>` format with constant-time comparison
//! - **Event Classification**: GitHub, GitLab, Bitbucket and generic event
//!   headers with body-field fallback
//! - **Handler Dispatch**: Several handlers per event plus catch-all handlers
//! - **Delivery Tracking**: Every dispatched payload gets a delivery record
//!   with its attempt history
//! - **Retries**: Linear or jittered exponential backoff, bounded attempts
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tether_core::{IntegrationContext, IntegrationResult};
//! use tether_webhooks::{handler_fn, WebhookConfig, WebhookManager};
//!
//! # async fn run() {
//! let manager = WebhookManager::new();
//! manager.register(
//!     "github",
//!     WebhookConfig::builder("https://api.example.com/hooks/github")
//!         .secret("your-webhook-secret")
//!         .events(["push", "pull_request"])
//!         .build(),
//! );
//!
//! manager.processor().on(
//!     "push",
//!     handler_fn(|payload, _ctx| async move {
//!         Ok(IntegrationResult::ok(json!({ "ref": payload.body["ref"] })))
//!     }),
//! );
//!
//! let body = br#"{"ref":"refs/heads/main"}"#.to_vec();
//! let signature = manager.generate_signature("github", &body).unwrap_or_default();
//! let result = manager
//!     .handle_webhook(
//!         "github",
//!         [("X-GitHub-Event", "push"), ("X-Hub-Signature-256", signature.as_str())],
//!         json!({ "ref": "refs/heads/main" }),
//!         body,
//!         IntegrationContext::new(),
//!     )
//!     .await;
//! assert!(result.is_success());
//! # }
//! ```

mod config;
mod error;
mod handler;
mod manager;
mod payload;
mod processor;
mod retry;
mod signature;
mod validator;

pub use config::{DEFAULT_SIGNATURE_HEADER, SignatureMethod, WebhookConfig, WebhookConfigBuilder};
pub use error::WebhookError;
pub use handler::{FnHandler, HandlerError, WebhookHandler, handler_fn};
pub use manager::WebhookManager;
pub use payload::{DeliveryStatus, RetryAttempt, WebhookDelivery, WebhookPayload};
pub use processor::{ProcessOutcome, WILDCARD_EVENT, WebhookProcessor};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use signature::SignatureValidator;
pub use validator::{EVENT_BODY_FIELDS, EVENT_HEADERS, ValidationVerdict, WebhookValidator};

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_line_up() {
        let config = WebhookConfig::default();
        assert_eq!(config.signature_header, DEFAULT_SIGNATURE_HEADER);
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.retry_policy.backoff, BackoffStrategy::Exponential);
    }
}
