//! OAuth client configuration

use std::collections::BTreeMap;
use std::fmt;

/// OAuth client registration for one integration.
///
/// Endpoint overrides replace the platform defaults; the custom platform
/// has no defaults and needs at least `authorize_url` and `token_url`.
#[derive(Clone, PartialEq)]
pub struct OAuthConfig {
    pub client_id: String,

    /// Absent for public clients that rely on PKCE
    pub client_secret: Option<String>,

    pub redirect_uri: String,

    pub scopes: Vec<String>,

    /// Send a PKCE S256 challenge with the authorization request
    pub use_pkce: bool,

    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub user_info_url: Option<String>,
    pub revoke_url: Option<String>,

    /// Additional authorization URL parameters, e.g. `prompt=consent`
    pub extra_params: BTreeMap<String, String>,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            redirect_uri: redirect_uri.into(),
            scopes: Vec::new(),
            use_pkce: false,
            authorize_url: None,
            token_url: None,
            user_info_url: None,
            revoke_url: None,
            extra_params: BTreeMap::new(),
        }
    }

    /// Configuration for a public client without a secret; enables PKCE
    pub fn public(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_secret: None,
            use_pkce: true,
            ..Self::new(client_id, String::new(), redirect_uri)
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pkce(mut self, use_pkce: bool) -> Self {
        self.use_pkce = use_pkce;
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = Some(url.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn with_user_info_url(mut self, url: impl Into<String>) -> Self {
        self.user_info_url = Some(url.into());
        self
    }

    pub fn with_revoke_url(mut self, url: impl Into<String>) -> Self {
        self.revoke_url = Some(url.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    pub(crate) fn secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<REDACTED>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("use_pkce", &self.use_pkce)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_info_url", &self.user_info_url)
            .field("revoke_url", &self.revoke_url)
            .field("extra_params", &self.extra_params)
            .finish()
    }
}
