//! # Tether
//!
//! OAuth 2.0 authorization and inbound webhook processing for third-party
//! developer platforms (GitHub, Vercel, Netlify, Slack, or any custom
//! provider) behind one [`Integration`] facade.
//!
//! Every public operation reports through [`IntegrationResult`]; errors from
//! platforms or the network never escape unwrapped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let integration = Integration::builder("github", Platform::GitHub)
//!     .oauth(OAuthConfig::new("client-id", "client-secret", "https://app.example.com/callback"))
//!     .webhook(WebhookConfig::builder("/webhooks/github").secret("s3cr3t").events(["push"]).build())
//!     .build()?;
//!
//! integration.on_webhook(
//!     "push",
//!     handler_fn(|payload, _ctx| async move {
//!         Ok(IntegrationResult::ok(json!({"ref": payload.body["ref"]})))
//!     }),
//! );
//!
//! let authorization = integration.initialize_oauth(OAuthState::new());
//! # Ok(())
//! # }
//! ```

mod error;
mod integration;

pub use error::{IntegrationError, Result};
pub use integration::{Integration, IntegrationBuilder};

// Re-export member crates
pub use tether_auth;
pub use tether_config;
pub use tether_core;
pub use tether_http_client;
pub use tether_webhooks;

pub use tether_core::{IntegrationContext, IntegrationResult, codes, lifecycle};

// Prelude for common imports
pub mod prelude {
    pub use crate::{Integration, IntegrationBuilder, IntegrationError};
    pub use tether_auth::{
        AuthorizationRequest, OAuthConfig, OAuthState, OAuthTokens, Platform, TokenExchange,
        UserInfo,
    };
    pub use tether_config::{ConfigLoader, IntegrationConfig};
    pub use tether_core::{
        ErrorInfo, IntegrationContext, IntegrationEvent, IntegrationResult, codes, lifecycle,
        listener_fn,
    };
    pub use tether_webhooks::{
        RetryPolicy, SignatureMethod, WebhookConfig, WebhookPayload, handler_fn,
    };
}
