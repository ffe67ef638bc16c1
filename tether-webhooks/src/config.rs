//! Per-integration webhook configuration

use crate::{Result, RetryPolicy, WebhookError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header carrying the signature when none is configured
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Supported signature digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignatureMethod {
    /// HMAC-SHA256 (default, GitHub `X-Hub-Signature-256`)
    #[default]
    HmacSha256,

    /// HMAC-SHA1 (legacy GitHub `X-Hub-Signature`)
    HmacSha1,
}

impl SignatureMethod {
    /// Prefix used in the `<algo>=<hex>` signature format
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "sha256",
            Self::HmacSha1 => "sha1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha1 => "hmac-sha1",
        }
    }
}

impl FromStr for SignatureMethod {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hmac-sha256" | "sha256" => Ok(Self::HmacSha256),
            "hmac-sha1" | "sha1" => Ok(Self::HmacSha1),
            other => Err(WebhookError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureMethod {
    type Error = WebhookError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SignatureMethod> for String {
    fn from(method: SignatureMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Webhook binding of one integration.
///
/// Supplied once when the integration is registered and never mutated.
#[derive(Clone, PartialEq)]
pub struct WebhookConfig {
    /// Endpoint URL, descriptive only
    pub endpoint: String,

    /// Shared secret used to verify signatures
    pub secret: Option<String>,

    /// Accepted event names, empty accepts any event
    pub events: Vec<String>,

    /// Header carrying the signature
    pub signature_header: String,

    pub signature_method: SignatureMethod,

    pub retry_policy: RetryPolicy,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            secret: None,
            events: Vec::new(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            signature_method: SignatureMethod::default(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl WebhookConfig {
    /// Create a configuration for an endpoint with defaults
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Create a builder for custom configuration
    pub fn builder(endpoint: impl Into<String>) -> WebhookConfigBuilder {
        WebhookConfigBuilder {
            config: Self::new(endpoint),
        }
    }

    /// Whether the allow-list accepts an event
    pub fn accepts(&self, event: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == event)
    }

    /// Check the invariants the type cannot express
    pub fn validate(&self) -> Result<()> {
        if self.signature_header.trim().is_empty() {
            return Err(WebhookError::ConfigError(
                "signature header must not be empty".to_string(),
            ));
        }
        if self.retry_policy.base_delay > self.retry_policy.max_delay {
            return Err(WebhookError::ConfigError(
                "retry base delay exceeds max delay".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("endpoint", &self.endpoint)
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .field("events", &self.events)
            .field("signature_header", &self.signature_header)
            .field("signature_method", &self.signature_method)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Builder for WebhookConfig
#[derive(Debug, Clone)]
pub struct WebhookConfigBuilder {
    config: WebhookConfig,
}

impl WebhookConfigBuilder {
    /// Set the shared secret
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    /// Set the accepted events
    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.events = events.into_iter().map(Into::into).collect();
        self
    }

    /// Set the signature header name
    pub fn signature_header(mut self, header: impl Into<String>) -> Self {
        self.config.signature_header = header.into();
        self
    }

    /// Set the signature method
    pub fn signature_method(mut self, method: SignatureMethod) -> Self {
        self.config.signature_method = method;
        self
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = policy;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WebhookConfig {
        self.config
    }
}
