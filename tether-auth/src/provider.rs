//! OAuth 2.0 authorization-code flow shared by every platform

use crate::pkce;
use crate::providers::{Endpoints, Platform, check_platform_error};
use crate::{
    AuthorizationRequest, OAuthConfig, OAuthError, OAuthState, OAuthTokens, Result,
    TokenExchange, UserInfo,
};
use serde_json::{Value, json};
use tether_http_client::{HttpClient, Response};
use tracing::{debug, info, warn};
use url::Url;

/// OAuth client for one platform.
///
/// The flow is implemented once; the [`Platform`] supplies endpoints and
/// response quirks.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    platform: Platform,
    config: OAuthConfig,
    endpoints: Endpoints,
    http: HttpClient,
}

impl OAuthProvider {
    /// Create a provider with a default HTTP client.
    ///
    /// Missing or malformed endpoints fail here, before any request is made.
    pub fn new(platform: Platform, config: OAuthConfig) -> Result<Self> {
        Self::with_http_client(platform, config, HttpClient::default_client()?)
    }

    pub fn with_http_client(platform: Platform, config: OAuthConfig, http: HttpClient) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(OAuthError::Configuration("client_id is required".to_string()));
        }
        let endpoints = Endpoints::resolve(platform, &config)?;
        Ok(Self {
            platform,
            config,
            endpoints,
            http,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Build the authorization URL for a new attempt.
    ///
    /// The returned state always carries a fresh anti-forgery token; any
    /// token present on the input is ignored.
    pub fn get_authorization_url(&self, state: &OAuthState) -> Result<AuthorizationRequest> {
        let mut attempt = state.clone();
        attempt.state = pkce::generate_state();
        attempt.code_verifier = None;
        if attempt.redirect_uri.is_none() {
            attempt.redirect_uri = Some(self.config.redirect_uri.clone());
        }
        if attempt.scopes.is_empty() {
            attempt.scopes = self.config.scopes.clone();
        }

        let mut url = Url::parse(&self.endpoints.authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", attempt.redirect_uri.as_deref().unwrap_or_default())
                .append_pair("response_type", "code")
                .append_pair("state", &attempt.state);

            if !attempt.scopes.is_empty() {
                query.append_pair("scope", &attempt.scopes.join(self.platform.scope_separator()));
            }

            if self.config.use_pkce {
                let verifier = pkce::generate_verifier();
                query
                    .append_pair("code_challenge", &pkce::challenge_for(&verifier))
                    .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD);
                attempt.code_verifier = Some(verifier);
            }

            for (key, value) in &self.config.extra_params {
                query.append_pair(key, value);
            }
        }

        debug!(platform = %self.platform, pkce = self.config.use_pkce, "Built authorization URL");
        Ok(AuthorizationRequest {
            authorization_url: url.into(),
            state: attempt,
        })
    }

    /// Exchange an authorization code for tokens, then look up the user.
    ///
    /// A failed user lookup does not fail the exchange.
    pub async fn exchange_code_for_tokens(&self, code: &str, state: &OAuthState) -> Result<TokenExchange> {
        let redirect_uri = state
            .redirect_uri
            .as_deref()
            .unwrap_or(&self.config.redirect_uri);

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
        ];
        match state.code_verifier.as_deref() {
            Some(verifier) if self.config.use_pkce => params.push(("code_verifier", verifier)),
            _ => {
                if let Some(secret) = self.config.secret() {
                    params.push(("client_secret", secret));
                }
            }
        }

        let body = self.token_request(&params).await?;
        let tokens = OAuthTokens::from_response(&self.platform.normalize_token_response(body))?;
        info!(platform = %self.platform, "Exchanged authorization code for tokens");

        let user_info = if self.endpoints.user_info_url.is_some() {
            match self.get_user_info(&tokens).await {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(platform = %self.platform, error = %e, "Failed to fetch user info after token exchange");
                    None
                }
            }
        } else {
            None
        };

        Ok(TokenExchange { tokens, user_info })
    }

    /// Obtain new tokens with a refresh token.
    ///
    /// When the platform does not rotate refresh tokens the old one is kept.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.secret() {
            params.push(("client_secret", secret));
        }

        let body = self.token_request(&params).await?;
        let mut tokens = OAuthTokens::from_response(&self.platform.normalize_token_response(body))?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        info!(platform = %self.platform, "Refreshed tokens");
        Ok(tokens)
    }

    /// Revoke tokens; a no-op when the platform has no revocation endpoint
    pub async fn revoke_tokens(&self, tokens: &OAuthTokens) -> Result<()> {
        let Some(url) = self.endpoints.revoke_url.as_deref() else {
            debug!(platform = %self.platform, "No revocation endpoint; skipping");
            return Ok(());
        };

        match self.platform {
            Platform::GitHub => {
                self.http
                    .delete(url)
                    .header("accept", "application/vnd.github+json")
                    .basic_auth(&self.config.client_id, self.config.secret())
                    .json(&json!({ "access_token": tokens.access_token }))
                    .send()
                    .await?
                    .error_for_status()?;
            }
            Platform::Slack => {
                let response = self
                    .http
                    .post(url)
                    .bearer_auth(&tokens.access_token)
                    .send()
                    .await?
                    .error_for_status()?;
                check_platform_error(&response.json::<Value>()?)?;
            }
            _ => {
                // RFC 7009
                let mut params = vec![
                    ("token", tokens.access_token.as_str()),
                    ("token_type_hint", "access_token"),
                    ("client_id", self.config.client_id.as_str()),
                ];
                if let Some(secret) = self.config.secret() {
                    params.push(("client_secret", secret));
                }
                self.http
                    .post(url)
                    .form(&params)
                    .send()
                    .await?
                    .error_for_status()?;
            }
        }

        info!(platform = %self.platform, "Revoked tokens");
        Ok(())
    }

    /// Fetch the identity behind an access token
    pub async fn get_user_info(&self, tokens: &OAuthTokens) -> Result<UserInfo> {
        let url = self.endpoints.user_info_url.as_deref().ok_or_else(|| {
            OAuthError::Configuration(format!("{} provider has no user info URL", self.platform))
        })?;

        let response = self
            .http
            .get(url)
            .accept_json()
            .bearer_auth(&tokens.access_token)
            .send()
            .await?
            .error_for_status()?;

        self.platform.parse_user_info(response.json()?)
    }

    /// Whether tokens are unexpired and accepted by the platform; never fails
    pub async fn validate_tokens(&self, tokens: &OAuthTokens) -> bool {
        if tokens.is_expired() {
            return false;
        }
        match self.get_user_info(tokens).await {
            Ok(_) => true,
            Err(e) => {
                debug!(platform = %self.platform, error = %e, "Token validation failed");
                false
            }
        }
    }

    /// POST to the token endpoint; platform errors in the body win over the status
    async fn token_request(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response: Response = self
            .http
            .post(&self.endpoints.token_url)
            .accept_json()
            .form(params)
            .send()
            .await?;

        let body = response.json::<Value>().ok();
        if let Some(body) = &body {
            check_platform_error(body)?;
        }
        response.error_for_status()?;

        body.ok_or_else(|| OAuthError::InvalidResponse("token response is not JSON".to_string()))
    }
}
