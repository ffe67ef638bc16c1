//! Declarative configuration for Tether integrations
//!
//! An [`IntegrationConfig`] describes one integration: its OAuth platform,
//! client registration, webhook verification and outbound HTTP settings.
//! Files are JSON or TOML; secrets are pulled in through `${VAR}` references
//! resolved against the environment (optionally seeded from a `.env` file).
//!
//! ```rust,no_run
//! use tether_config::{ConfigLoader, IntegrationConfig};
//!
//! # fn run() -> tether_config::Result<()> {
//! ConfigLoader::load_dotenv(None)?;
//! let config: IntegrationConfig = ConfigLoader::auto("integrations/github.toml")?
//!     .load("integrations/github.toml")?;
//!
//! let webhook = config.webhook_config()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod integration;
pub mod loader;
pub mod validation;

pub use error::{ConfigError, Result};
pub use integration::{
    Backoff, HttpSettings, IntegrationConfig, OAuthSettings, RetrySettings, WebhookSettings,
};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};
