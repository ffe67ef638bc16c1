//! Vercel integration OAuth

use crate::tokens::{id_field, string_field};
use crate::{OAuthError, Result, UserInfo};
use serde_json::Value;

pub const AUTH_URL: &str = "https://vercel.com/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.vercel.com/v2/oauth/access_token";
pub const USER_INFO_URL: &str = "https://api.vercel.com/v2/user";

/// `GET /v2/user` wraps the account in a `user` object
pub(crate) fn user_info(body: Value) -> Result<UserInfo> {
    let user = body.get("user").unwrap_or(&body);
    let id = id_field(user, "id")
        .or_else(|| id_field(user, "uid"))
        .ok_or_else(|| OAuthError::InvalidResponse("Vercel user without id".to_string()))?;

    Ok(UserInfo {
        id,
        login: string_field(user, "username"),
        name: string_field(user, "name"),
        email: string_field(user, "email"),
        avatar_url: string_field(user, "avatar")
            .map(|hash| format!("https://vercel.com/api/www/avatar/{}", hash)),
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vercel_user() {
        let user = user_info(json!({
            "user": {
                "id": "AEIIDYVk59zbFF2Sxfyxxmua",
                "username": "rauchg",
                "email": "me@example.com",
                "avatar": "abc123"
            }
        }))
        .unwrap();

        assert_eq!(user.id, "AEIIDYVk59zbFF2Sxfyxxmua");
        assert_eq!(user.login.as_deref(), Some("rauchg"));
        assert_eq!(user.avatar_url.as_deref(), Some("https://vercel.com/api/www/avatar/abc123"));
    }
}
