// Supported OAuth platforms

pub mod custom;
pub mod github;
pub mod netlify;
pub mod slack;
pub mod vercel;

use crate::tokens::string_field;
use crate::{OAuthConfig, OAuthError, Result, UserInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Closed set of platforms an integration can authorize against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(rename = "github")]
    GitHub,
    Vercel,
    Netlify,
    Slack,
    /// Any RFC 6749 provider; every endpoint comes from configuration
    Custom,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Vercel => "vercel",
            Self::Netlify => "netlify",
            Self::Slack => "slack",
            Self::Custom => "custom",
        }
    }

    /// Separator used to join scopes in the authorization URL
    pub fn scope_separator(&self) -> &'static str {
        match self {
            Self::Slack => ",",
            _ => " ",
        }
    }

    fn default_endpoints(&self, client_id: &str) -> EndpointDefaults {
        match self {
            Self::GitHub => EndpointDefaults {
                authorize_url: Some(github::AUTH_URL.to_string()),
                token_url: Some(github::TOKEN_URL.to_string()),
                user_info_url: Some(github::USER_INFO_URL.to_string()),
                revoke_url: Some(github::revoke_url(client_id)),
            },
            Self::Vercel => EndpointDefaults {
                authorize_url: Some(vercel::AUTH_URL.to_string()),
                token_url: Some(vercel::TOKEN_URL.to_string()),
                user_info_url: Some(vercel::USER_INFO_URL.to_string()),
                revoke_url: None,
            },
            Self::Netlify => EndpointDefaults {
                authorize_url: Some(netlify::AUTH_URL.to_string()),
                token_url: Some(netlify::TOKEN_URL.to_string()),
                user_info_url: Some(netlify::USER_INFO_URL.to_string()),
                revoke_url: None,
            },
            Self::Slack => EndpointDefaults {
                authorize_url: Some(slack::AUTH_URL.to_string()),
                token_url: Some(slack::TOKEN_URL.to_string()),
                user_info_url: Some(slack::USER_INFO_URL.to_string()),
                revoke_url: Some(slack::REVOKE_URL.to_string()),
            },
            Self::Custom => EndpointDefaults::default(),
        }
    }

    /// Reshape a token response into the standard field layout
    pub(crate) fn normalize_token_response(&self, body: Value) -> Value {
        match self {
            Self::Slack => slack::normalize_token_response(body),
            _ => body,
        }
    }

    /// Map a user-info response onto [`UserInfo`]
    pub(crate) fn parse_user_info(&self, body: Value) -> Result<UserInfo> {
        match self {
            Self::GitHub => github::user_info(body),
            Self::Vercel => vercel::user_info(body),
            Self::Netlify => netlify::user_info(body),
            Self::Slack => slack::user_info(body),
            Self::Custom => custom::user_info(body),
        }
    }
}

impl FromStr for Platform {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "vercel" => Ok(Self::Vercel),
            "netlify" => Ok(Self::Netlify),
            "slack" => Ok(Self::Slack),
            "custom" => Ok(Self::Custom),
            other => Err(OAuthError::Configuration(format!("unknown provider: {}", other))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct EndpointDefaults {
    authorize_url: Option<String>,
    token_url: Option<String>,
    user_info_url: Option<String>,
    revoke_url: Option<String>,
}

/// Endpoints in effect for a provider, after applying overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub user_info_url: Option<String>,
    pub revoke_url: Option<String>,
}

impl Endpoints {
    /// Merge configured overrides over the platform defaults.
    ///
    /// Fails without any network activity when a required URL is missing
    /// or malformed.
    pub fn resolve(platform: Platform, config: &OAuthConfig) -> Result<Self> {
        let defaults = platform.default_endpoints(&config.client_id);

        Ok(Self {
            authorize_url: required(platform, &config.authorize_url, defaults.authorize_url, "authorize_url")?,
            token_url: required(platform, &config.token_url, defaults.token_url, "token_url")?,
            user_info_url: optional(&config.user_info_url, defaults.user_info_url, "user_info_url")?,
            revoke_url: optional(&config.revoke_url, defaults.revoke_url, "revoke_url")?,
        })
    }
}

fn required(
    platform: Platform,
    value: &Option<String>,
    default: Option<String>,
    name: &str,
) -> Result<String> {
    let url = value.clone().or(default).ok_or_else(|| {
        OAuthError::Configuration(format!("{} provider requires {}", platform, name))
    })?;
    check_url(&url, name)?;
    Ok(url)
}

fn optional(value: &Option<String>, default: Option<String>, name: &str) -> Result<Option<String>> {
    match value.clone().or(default) {
        Some(url) => {
            check_url(&url, name)?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

fn check_url(url: &str, name: &str) -> Result<()> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|e| OAuthError::Configuration(format!("invalid {}: {}", name, e)))
}

/// Surface failures reported inside a 2xx body (`ok: false` or an `error` field)
pub(crate) fn check_platform_error(body: &Value) -> Result<()> {
    if body.get("ok").and_then(Value::as_bool) == Some(false) {
        let error = string_field(body, "error").unwrap_or_else(|| "unknown_error".to_string());
        return Err(OAuthError::Platform(error));
    }

    if let Some(error) = string_field(body, "error") {
        let message = match string_field(body, "error_description") {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        return Err(OAuthError::Platform(message));
    }

    Ok(())
}
