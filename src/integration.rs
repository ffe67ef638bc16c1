//! The integration facade

use crate::Result;
use serde_json::{Value, json};
use tether_auth::{
    AuthorizationRequest, OAuthConfig, OAuthProvider, OAuthState, OAuthTokens, Platform,
    TokenExchange, UserInfo,
};
use tether_config::{IntegrationConfig, Validate};
use tether_core::{
    ErrorInfo, EventListener, IntegrationContext, IntegrationEvent, IntegrationEvents,
    IntegrationResult, codes, lifecycle,
};
use tether_http_client::{HttpClient, HttpClientConfig};
use tether_webhooks::{WebhookConfig, WebhookHandler, WebhookManager};
use tracing::{debug, info, warn};

/// One third-party integration: an optional OAuth provider, a webhook
/// manager, and the lifecycle event bus both report to.
#[derive(Debug, Clone)]
pub struct Integration {
    name: String,
    platform: Platform,
    provider: Option<OAuthProvider>,
    webhooks: WebhookManager,
    events: IntegrationEvents,
}

impl Integration {
    /// Build an integration from declarative configuration.
    ///
    /// Invalid configuration, including a custom provider without its
    /// authorize or token URL, fails here before any network activity.
    pub fn new(config: IntegrationConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder(config.name.clone(), config.provider)
            .http_config(config.http_client_config());
        if let Some(oauth) = config.oauth_config() {
            builder = builder.oauth(oauth);
        }
        if let Some(webhook) = config.webhook_config()? {
            builder = builder.webhook(webhook);
        }
        builder.build()
    }

    pub fn builder(name: impl Into<String>, platform: Platform) -> IntegrationBuilder {
        IntegrationBuilder::new(name, platform)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The OAuth provider, when OAuth is configured
    pub fn provider(&self) -> Option<&OAuthProvider> {
        self.provider.as_ref()
    }

    pub fn webhooks(&self) -> &WebhookManager {
        &self.webhooks
    }

    pub fn events(&self) -> &IntegrationEvents {
        &self.events
    }

    /// Register a webhook handler for an event; `"*"` registers a catch-all
    pub fn on_webhook<H>(&self, event: impl Into<String>, handler: H)
    where
        H: WebhookHandler + 'static,
    {
        self.webhooks.processor().on(event, handler);
    }

    /// Subscribe to a lifecycle event such as `webhook.received`
    pub fn on<L>(&self, event: impl Into<String>, listener: L)
    where
        L: EventListener + 'static,
    {
        self.events.subscribe(event, listener);
    }

    /// Start an authorization: build the URL the user is redirected to.
    ///
    /// The returned state carries a fresh anti-forgery token and, with PKCE,
    /// the code verifier; the caller keeps it until the callback arrives.
    pub fn initialize_oauth(&self, state: OAuthState) -> IntegrationResult<AuthorizationRequest> {
        let provider = match self.oauth_provider() {
            Ok(provider) => provider,
            Err(failure) => return failure,
        };

        match provider.get_authorization_url(&state) {
            Ok(request) => {
                debug!(integration = %self.name, "Generated authorization URL");
                IntegrationResult::ok(request)
            }
            Err(e) => {
                warn!(integration = %self.name, error = %e, "Failed to initialize OAuth");
                IntegrationResult::failure(
                    e.to_error_info(codes::OAUTH_INIT_FAILED, "Failed to initialize OAuth"),
                )
            }
        }
    }

    /// Exchange the callback code for tokens and the authorized user's identity
    pub async fn complete_oauth(&self, code: &str, state: &OAuthState) -> IntegrationResult<TokenExchange> {
        let provider = match self.oauth_provider() {
            Ok(provider) => provider,
            Err(failure) => return failure,
        };
        let context = state.to_context();

        match provider.exchange_code_for_tokens(code, state).await {
            Ok(exchange) => {
                info!(integration = %self.name, "OAuth flow completed");
                self.emit(
                    lifecycle::OAUTH_COMPLETED,
                    json!({ "tokens": exchange.tokens, "userInfo": exchange.user_info }),
                    context,
                )
                .await;
                IntegrationResult::ok(exchange)
            }
            Err(e) => {
                warn!(integration = %self.name, error = %e, "OAuth code exchange failed");
                let error = e.to_error_info(codes::OAUTH_EXCHANGE_FAILED, "Failed to complete OAuth");
                self.emit(lifecycle::OAUTH_FAILED, json!({ "error": error }), context)
                    .await;
                IntegrationResult::failure(error)
            }
        }
    }

    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        context: IntegrationContext,
    ) -> IntegrationResult<OAuthTokens> {
        let provider = match self.oauth_provider() {
            Ok(provider) => provider,
            Err(failure) => return failure,
        };

        match provider.refresh_tokens(refresh_token).await {
            Ok(tokens) => {
                debug!(integration = %self.name, "Refreshed tokens");
                self.emit(
                    lifecycle::TOKENS_REFRESHED,
                    json!({ "expiresAt": tokens.expires_at, "scope": tokens.scope }),
                    context,
                )
                .await;
                IntegrationResult::ok(tokens)
            }
            Err(e) => {
                warn!(integration = %self.name, error = %e, "Token refresh failed");
                IntegrationResult::failure(
                    e.to_error_info(codes::TOKEN_REFRESH_FAILED, "Failed to refresh tokens"),
                )
            }
        }
    }

    pub async fn revoke_tokens(
        &self,
        tokens: &OAuthTokens,
        context: IntegrationContext,
    ) -> IntegrationResult<()> {
        let provider = match self.oauth_provider() {
            Ok(provider) => provider,
            Err(failure) => return failure,
        };

        match provider.revoke_tokens(tokens).await {
            Ok(()) => {
                self.emit(lifecycle::TOKENS_REVOKED, Value::Null, context).await;
                IntegrationResult::ok_empty()
            }
            Err(e) => {
                warn!(integration = %self.name, error = %e, "Token revocation failed");
                IntegrationResult::failure(
                    e.to_error_info(codes::TOKEN_REVOKE_FAILED, "Failed to revoke tokens"),
                )
            }
        }
    }

    /// Whether the tokens are unexpired and accepted by the platform.
    ///
    /// `false` without OAuth configuration.
    pub async fn validate_tokens(&self, tokens: &OAuthTokens) -> bool {
        match &self.provider {
            Some(provider) => provider.validate_tokens(tokens).await,
            None => false,
        }
    }

    pub async fn get_user_info(&self, tokens: &OAuthTokens) -> IntegrationResult<UserInfo> {
        let provider = match self.oauth_provider() {
            Ok(provider) => provider,
            Err(failure) => return failure,
        };

        match provider.get_user_info(tokens).await {
            Ok(user) => IntegrationResult::ok(user),
            Err(e) => IntegrationResult::failure(
                e.to_error_info(codes::USER_INFO_FAILED, "Failed to fetch user info"),
            ),
        }
    }

    /// Receive an inbound webhook.
    ///
    /// `raw_body` must be the exact bytes received; signatures are checked
    /// against it, never against `body`.
    pub async fn handle_webhook<I, K, V>(
        &self,
        headers: I,
        body: Value,
        raw_body: impl Into<Vec<u8>>,
        context: IntegrationContext,
    ) -> IntegrationResult
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.webhooks
            .handle_webhook(&self.name, headers, body, raw_body, context)
            .await
    }

    /// Re-attempt a recorded delivery after its backoff delay
    pub async fn retry_webhook<I, K, V>(
        &self,
        delivery_id: &str,
        headers: I,
        body: Value,
        raw_body: impl Into<Vec<u8>>,
        context: IntegrationContext,
    ) -> IntegrationResult
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.webhooks
            .retry_webhook(&self.name, delivery_id, headers, body, raw_body, context)
            .await
    }

    fn oauth_provider<T>(&self) -> std::result::Result<&OAuthProvider, IntegrationResult<T>> {
        self.provider.as_ref().ok_or_else(|| {
            IntegrationResult::failure(
                ErrorInfo::new(
                    codes::NO_OAUTH_CONFIG,
                    format!("OAuth is not configured for integration: {}", self.name),
                )
                .retryable(false),
            )
        })
    }

    async fn emit(&self, name: &str, data: Value, context: IntegrationContext) {
        let failed = self
            .events
            .emit(IntegrationEvent::new(name, &self.name, data, context))
            .await;
        if failed > 0 {
            debug!(integration = %self.name, event = name, failed, "Lifecycle listeners reported errors");
        }
    }
}

/// Programmatic construction of an [`Integration`]
#[derive(Debug)]
pub struct IntegrationBuilder {
    name: String,
    platform: Platform,
    oauth: Option<OAuthConfig>,
    webhook: Option<WebhookConfig>,
    http_config: HttpClientConfig,
    http_client: Option<HttpClient>,
    events: IntegrationEvents,
}

impl IntegrationBuilder {
    fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
            oauth: None,
            webhook: None,
            http_config: HttpClientConfig::default(),
            http_client: None,
            events: IntegrationEvents::new(),
        }
    }

    pub fn oauth(mut self, config: OAuthConfig) -> Self {
        self.oauth = Some(config);
        self
    }

    pub fn webhook(mut self, config: WebhookConfig) -> Self {
        self.webhook = Some(config);
        self
    }

    /// Configuration for the outbound client built at [`build`](Self::build)
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Use an existing client instead of building one
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Share a lifecycle event bus with other integrations
    pub fn events(mut self, events: IntegrationEvents) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Result<Integration> {
        let provider = match self.oauth {
            Some(config) => {
                let http = match self.http_client {
                    Some(client) => client,
                    None => HttpClient::new(self.http_config)?,
                };
                Some(OAuthProvider::with_http_client(self.platform, config, http)?)
            }
            None => None,
        };

        let webhooks = WebhookManager::with_events(self.events.clone());
        if let Some(config) = self.webhook {
            webhooks.register(self.name.clone(), config);
        }

        info!(
            integration = %self.name,
            platform = %self.platform,
            oauth = provider.is_some(),
            "Integration initialized"
        );

        Ok(Integration {
            name: self.name,
            platform: self.platform,
            provider,
            webhooks,
            events: self.events,
        })
    }
}
