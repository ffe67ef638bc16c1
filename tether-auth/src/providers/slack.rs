//! Slack OAuth v2

use crate::providers::check_platform_error;
use crate::tokens::string_field;
use crate::{OAuthError, Result, UserInfo};
use serde_json::Value;

pub const AUTH_URL: &str = "https://slack.com/oauth/v2/authorize";
pub const TOKEN_URL: &str = "https://slack.com/api/oauth.v2.access";
pub const USER_INFO_URL: &str = "https://slack.com/api/auth.test";
pub const REVOKE_URL: &str = "https://slack.com/api/auth.revoke";

/// User-token installs carry the token under `authed_user` only
pub(crate) fn normalize_token_response(mut body: Value) -> Value {
    let has_bot_token = body
        .get("access_token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.is_empty());
    if has_bot_token {
        return body;
    }

    let Some(authed_user) = body.get("authed_user").cloned() else {
        return body;
    };
    if let Some(fields) = body.as_object_mut() {
        for key in ["access_token", "refresh_token", "expires_in", "token_type", "scope"] {
            if let Some(value) = authed_user.get(key) {
                fields.insert(key.to_string(), value.clone());
            }
        }
    }
    body
}

/// `auth.test` answers 200 with `ok: false` for bad tokens
pub(crate) fn user_info(body: Value) -> Result<UserInfo> {
    check_platform_error(&body)?;
    let id = string_field(&body, "user_id")
        .ok_or_else(|| OAuthError::InvalidResponse("Slack auth.test without user_id".to_string()))?;

    Ok(UserInfo {
        id,
        login: string_field(&body, "user"),
        name: string_field(&body, "user"),
        email: None,
        avatar_url: None,
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bot_token_kept() {
        let body = normalize_token_response(json!({
            "ok": true,
            "access_token": "xoxb-1",
            "authed_user": {"id": "U1", "access_token": "xoxp-1"}
        }));
        assert_eq!(body["access_token"], "xoxb-1");
    }

    #[test]
    fn test_user_token_promoted() {
        let body = normalize_token_response(json!({
            "ok": true,
            "authed_user": {"id": "U1", "access_token": "xoxp-1", "scope": "users:read", "token_type": "user"}
        }));
        assert_eq!(body["access_token"], "xoxp-1");
        assert_eq!(body["scope"], "users:read");
    }

    #[test]
    fn test_auth_test_user() {
        let user = user_info(json!({"ok": true, "user": "grace", "user_id": "U123", "team_id": "T1"})).unwrap();
        assert_eq!(user.id, "U123");
        assert_eq!(user.login.as_deref(), Some("grace"));
    }

    #[test]
    fn test_auth_test_failure() {
        let err = user_info(json!({"ok": false, "error": "invalid_auth"})).unwrap_err();
        assert!(matches!(err, OAuthError::Platform(ref e) if e == "invalid_auth"));
    }
}
