//! Generic provider with configured endpoints

use crate::tokens::{id_field, string_field};
use crate::{OAuthError, Result, UserInfo};
use serde_json::Value;

/// Accepts OIDC-style (`sub`, `picture`) and common REST field names
pub(crate) fn user_info(body: Value) -> Result<UserInfo> {
    let id = ["id", "sub", "user_id"]
        .iter()
        .find_map(|key| id_field(&body, key))
        .ok_or_else(|| OAuthError::InvalidResponse("user info without id".to_string()))?;
    let first = |keys: &[&str]| keys.iter().find_map(|key| string_field(&body, key));
    let login = first(&["login", "username", "preferred_username"]);
    let name = first(&["name"]);
    let email = first(&["email"]);
    let avatar_url = first(&["avatar_url", "picture"]);

    Ok(UserInfo {
        id,
        login,
        name,
        email,
        avatar_url,
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_oidc_claims() {
        let user = user_info(json!({
            "sub": "248289761001",
            "preferred_username": "j.doe",
            "name": "Jane Doe",
            "picture": "https://example.com/j.jpg"
        }))
        .unwrap();

        assert_eq!(user.id, "248289761001");
        assert_eq!(user.login.as_deref(), Some("j.doe"));
        assert_eq!(user.avatar_url.as_deref(), Some("https://example.com/j.jpg"));
    }

    #[test]
    fn test_missing_id() {
        assert!(matches!(user_info(json!({"name": "x"})), Err(OAuthError::InvalidResponse(_))));
    }
}
