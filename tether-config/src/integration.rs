//! Declarative integration configuration

use crate::{ConfigError, ConfigValidator, Result, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tether_auth::{OAuthConfig, Platform};
use tether_http_client::{HttpClientConfig, RetryConfig};
use tether_webhooks::{BackoffStrategy, RetryPolicy, SignatureMethod, WebhookConfig};

/// One integration as written in a configuration file.
///
/// ```toml
/// name = "github"
/// provider = "github"
///
/// [oauth]
/// client_id = "Iv1.abc"
/// client_secret = "${GITHUB_CLIENT_SECRET}"
/// redirect_uri = "https://app.example.com/oauth/github/callback"
/// scopes = ["repo", "read:user"]
///
/// [webhook]
/// endpoint = "/webhooks/github"
/// secret = "${GITHUB_WEBHOOK_SECRET}"
/// events = ["push", "pull_request"]
///
/// [webhook.retry]
/// max_retries = 5
/// backoff = "linear"
/// base_delay_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub name: String,

    pub provider: Platform,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSettings>,
}

impl IntegrationConfig {
    pub fn new(name: impl Into<String>, provider: Platform) -> Self {
        Self {
            name: name.into(),
            provider,
            oauth: None,
            webhook: None,
            http: None,
        }
    }

    pub fn with_oauth(mut self, oauth: OAuthSettings) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn with_webhook(mut self, webhook: WebhookSettings) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = Some(http);
        self
    }

    /// OAuth client configuration, if an `oauth` block is present
    pub fn oauth_config(&self) -> Option<OAuthConfig> {
        self.oauth.as_ref().map(OAuthSettings::to_oauth_config)
    }

    /// Webhook configuration, if a `webhook` block is present
    pub fn webhook_config(&self) -> Result<Option<WebhookConfig>> {
        self.webhook
            .as_ref()
            .map(WebhookSettings::to_webhook_config)
            .transpose()
    }

    /// HTTP client configuration; defaults when no `http` block is present
    pub fn http_client_config(&self) -> HttpClientConfig {
        self.http
            .as_ref()
            .map(HttpSettings::to_http_client_config)
            .unwrap_or_default()
    }
}

impl Validate for IntegrationConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.name, "name")?;

        if let Some(oauth) = &self.oauth {
            oauth.validate()?;
            if self.provider == Platform::Custom {
                ConfigValidator::required(oauth.authorize_url.as_deref(), "oauth.authorize_url")?;
                ConfigValidator::required(oauth.token_url.as_deref(), "oauth.token_url")?;
            }
        }
        if let Some(webhook) = &self.webhook {
            webhook.validate()?;
        }
        if let Some(http) = &self.http {
            http.validate()?;
        }
        Ok(())
    }
}

/// `oauth` block
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    pub redirect_uri: String,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub use_pkce: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_url: Option<String>,

    /// Extra authorization URL parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl OAuthSettings {
    pub fn to_oauth_config(&self) -> OAuthConfig {
        let mut config = OAuthConfig::new(
            self.client_id.clone(),
            self.client_secret.clone().unwrap_or_default(),
            self.redirect_uri.clone(),
        )
        .with_scopes(self.scopes.iter().cloned())
        .with_pkce(self.use_pkce);

        config.client_secret = self.client_secret.clone().filter(|s| !s.is_empty());
        config.authorize_url = self.authorize_url.clone();
        config.token_url = self.token_url.clone();
        config.user_info_url = self.user_info_url.clone();
        config.revoke_url = self.revoke_url.clone();
        config.extra_params = self.params.clone();
        config
    }
}

impl Validate for OAuthSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.client_id, "oauth.client_id")?;
        ConfigValidator::not_empty(&self.redirect_uri, "oauth.redirect_uri")?;
        ConfigValidator::is_url(&self.redirect_uri, "oauth.redirect_uri")?;

        let overrides = [
            (&self.authorize_url, "oauth.authorize_url"),
            (&self.token_url, "oauth.token_url"),
            (&self.user_info_url, "oauth.user_info_url"),
            (&self.revoke_url, "oauth.revoke_url"),
        ];
        for (url, field) in overrides {
            if let Some(url) = url {
                ConfigValidator::is_url(url, field)?;
            }
        }

        if self.client_secret.as_deref().is_none_or(str::is_empty) && !self.use_pkce {
            return Err(ConfigError::ValidationError(
                "oauth.client_secret is required unless use_pkce is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<REDACTED>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("use_pkce", &self.use_pkce)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_info_url", &self.user_info_url)
            .field("revoke_url", &self.revoke_url)
            .field("params", &self.params)
            .finish()
    }
}

/// `webhook` block
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSettings {
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Allowed event types; empty allows every event
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_header: Option<String>,

    /// `hmac-sha256` (default) or `hmac-sha1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,
}

impl WebhookSettings {
    pub fn to_webhook_config(&self) -> Result<WebhookConfig> {
        let mut builder = WebhookConfig::builder(self.endpoint.clone()).events(self.events.iter().cloned());

        if let Some(secret) = self.secret.as_ref().filter(|s| !s.is_empty()) {
            builder = builder.secret(secret.clone());
        }
        if let Some(header) = &self.signature_header {
            builder = builder.signature_header(header.clone());
        }
        if let Some(method) = &self.signature_method {
            let method: SignatureMethod = method
                .parse()
                .map_err(|e: tether_webhooks::WebhookError| ConfigError::ValidationError(e.to_string()))?;
            builder = builder.signature_method(method);
        }
        if let Some(retry) = &self.retry {
            builder = builder.retry_policy(retry.to_retry_policy());
        }

        let config = builder.build();
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }
}

impl Validate for WebhookSettings {
    fn validate(&self) -> Result<()> {
        if let Some(header) = &self.signature_header {
            ConfigValidator::not_empty(header, "webhook.signature_header")?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        self.to_webhook_config().map(|_| ())
    }
}

impl fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("endpoint", &self.endpoint)
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .field("events", &self.events)
            .field("signature_header", &self.signature_header)
            .field("signature_method", &self.signature_method)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Backoff names accepted in files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Linear,
    #[default]
    Exponential,
}

/// `webhook.retry` block; delays in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub backoff: Backoff,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: Backoff::default(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: match self.backoff {
                Backoff::Linear => BackoffStrategy::Linear,
                Backoff::Exponential => BackoffStrategy::Exponential,
            },
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Validate for RetrySettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::ordered(
            self.base_delay_ms,
            self.max_delay_ms,
            "webhook.retry.base_delay_ms",
            "webhook.retry.max_delay_ms",
        )
    }
}

/// `http` block for the outbound client used by OAuth
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Attempts per outbound request, the first one included; no retry when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl HttpSettings {
    pub fn to_http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder();

        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(max_attempts) = self.max_attempts {
            builder = builder.retry(RetryConfig {
                max_attempts,
                ..Default::default()
            });
        }
        for (name, value) in &self.headers {
            builder = builder.default_header(name.clone(), value.clone());
        }

        builder.build()
    }
}

impl Validate for HttpSettings {
    fn validate(&self) -> Result<()> {
        if let Some(ms) = self.timeout_ms {
            ConfigValidator::positive(ms, "http.timeout_ms")?;
        }
        if let Some(ms) = self.connect_timeout_ms {
            ConfigValidator::positive(ms, "http.connect_timeout_ms")?;
        }
        if let Some(attempts) = self.max_attempts {
            ConfigValidator::positive(u64::from(attempts), "http.max_attempts")?;
        }
        Ok(())
    }
}
