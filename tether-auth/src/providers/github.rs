//! GitHub OAuth App

use crate::tokens::{id_field, string_field};
use crate::{OAuthError, Result, UserInfo};
use serde_json::Value;

pub const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const USER_INFO_URL: &str = "https://api.github.com/user";

/// Token revocation lives under the application, authenticated with the client credentials
pub fn revoke_url(client_id: &str) -> String {
    format!("https://api.github.com/applications/{}/token", client_id)
}

pub(crate) fn user_info(body: Value) -> Result<UserInfo> {
    let id = id_field(&body, "id")
        .ok_or_else(|| OAuthError::InvalidResponse("GitHub user without id".to_string()))?;

    Ok(UserInfo {
        id,
        login: string_field(&body, "login"),
        name: string_field(&body, "name"),
        email: string_field(&body, "email"),
        avatar_url: string_field(&body, "avatar_url"),
        raw: body,
    })
}
