//! Shared building blocks for Tether integrations
//!
//! Every public operation in the Tether workspace reports its outcome through
//! the same [`IntegrationResult`] envelope, threads the caller's
//! [`IntegrationContext`] through unchanged, and announces lifecycle changes
//! through an [`IntegrationEvents`] emitter owned by the integration.
//!
//! # Example
//!
//! ```rust
//! use tether_core::{codes, ErrorInfo, IntegrationResult};
//!
//! let ok: IntegrationResult<u32> = IntegrationResult::ok(42);
//! assert!(ok.is_success());
//!
//! let failed: IntegrationResult<u32> =
//!     IntegrationResult::failure(ErrorInfo::new(codes::NO_HANDLER, "nobody listens").retryable(false));
//! assert_eq!(failed.error_code(), Some(codes::NO_HANDLER));
//! ```

mod context;
mod events;
mod result;

pub use context::IntegrationContext;
pub use events::{
    EventListener, FnListener, IntegrationEvent, IntegrationEvents, ListenerError, listener_fn,
};
pub use result::{ErrorInfo, IntegrationResult, codes};

/// Lifecycle event names emitted by integrations.
pub mod lifecycle {
    /// A webhook was validated and handled successfully
    pub const WEBHOOK_RECEIVED: &str = "webhook.received";

    /// A webhook failed validation, dispatch or handling
    pub const WEBHOOK_FAILED: &str = "webhook.failed";

    /// An authorization code was exchanged for tokens
    pub const OAUTH_COMPLETED: &str = "oauth.completed";

    /// The code exchange failed
    pub const OAUTH_FAILED: &str = "oauth.failed";

    /// Tokens were refreshed
    pub const TOKENS_REFRESHED: &str = "tokens.refreshed";

    /// Tokens were revoked at the platform
    pub const TOKENS_REVOKED: &str = "tokens.revoked";
}
