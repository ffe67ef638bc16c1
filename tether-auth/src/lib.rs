//! OAuth 2.0 for Tether integrations
//!
//! One [`OAuthProvider`] implements the authorization-code flow for every
//! supported [`Platform`]:
//!
//! - **GitHub**, **Vercel**, **Netlify**, **Slack** with built-in endpoints
//! - **Custom** providers configured entirely through [`OAuthConfig`]
//!
//! Authorization URLs always carry a fresh anti-forgery state token and, when
//! enabled, a PKCE S256 challenge.
//!
//! # Example
//!
//! ```rust,no_run
//! use tether_auth::{OAuthConfig, OAuthProvider, OAuthState, Platform};
//!
//! # async fn run() -> tether_auth::Result<()> {
//! let provider = OAuthProvider::new(
//!     Platform::GitHub,
//!     OAuthConfig::new("client-id", "client-secret", "https://app.example.com/oauth/callback")
//!         .with_scopes(["repo", "read:user"]),
//! )?;
//!
//! let request = provider.get_authorization_url(&OAuthState::new())?;
//! // Redirect the user to request.authorization_url and keep request.state
//!
//! let exchange = provider.exchange_code_for_tokens("code-from-callback", &request.state).await?;
//! println!("authorized {:?}", exchange.user_info.map(|u| u.login));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod pkce;
mod provider;
pub mod providers;
mod tokens;

pub use config::OAuthConfig;
pub use error::{OAuthError, Result};
pub use provider::OAuthProvider;
pub use providers::{Endpoints, Platform};
pub use tokens::{AuthorizationRequest, OAuthState, OAuthTokens, TokenExchange, UserInfo};
