//! Netlify OAuth

use crate::tokens::{id_field, string_field};
use crate::{OAuthError, Result, UserInfo};
use serde_json::Value;

pub const AUTH_URL: &str = "https://app.netlify.com/authorize";
pub const TOKEN_URL: &str = "https://api.netlify.com/oauth/token";
pub const USER_INFO_URL: &str = "https://api.netlify.com/api/v1/user";

pub(crate) fn user_info(body: Value) -> Result<UserInfo> {
    let id = id_field(&body, "id")
        .ok_or_else(|| OAuthError::InvalidResponse("Netlify user without id".to_string()))?;

    Ok(UserInfo {
        id,
        login: string_field(&body, "slug"),
        name: string_field(&body, "full_name"),
        email: string_field(&body, "email"),
        avatar_url: string_field(&body, "avatar_url"),
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_netlify_user() {
        let user = user_info(json!({
            "id": "5c4a3f",
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "slug": "jane"
        }))
        .unwrap();
        assert_eq!(user.name.as_deref(), Some("Jane Doe"));
        assert_eq!(user.login.as_deref(), Some("jane"));
    }
}
