//! # Tether HTTP Client
//!
//! Outbound HTTP for Tether's OAuth providers. Requests are built with
//! [`OutboundRequest`], answers come back fully buffered as [`Response`],
//! and transient failures can be retried under a [`RetryConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether_http_client::{HttpClient, HttpClientConfig, RetryConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpClientConfig::builder()
//!         .timeout(Duration::from_secs(10))
//!         .retry(RetryConfig::default())
//!         .build();
//!
//!     let client = HttpClient::new(config)?;
//!     let response = client
//!         .get("https://api.github.com/user")
//!         .accept_json()
//!         .bearer_auth("gho_token")
//!         .send()
//!         .await?
//!         .error_for_status()?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;

pub use client::HttpClient;
pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::OutboundRequest;
pub use response::Response;
pub use retry::{Backoff, MAX_RETRY_DELAY, RetryConfig};

pub use http::{HeaderMap, Method, StatusCode};
pub use url::Url;
