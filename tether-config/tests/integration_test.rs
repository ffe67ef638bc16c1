//! Integration tests for loading integration configuration files

use std::io::Write;
use std::time::Duration;
use tether_auth::Platform;
use tether_config::*;
use tether_webhooks::{BackoffStrategy, SignatureMethod};

const GITHUB_TOML: &str = r#"
name = "github"
provider = "github"

[oauth]
client_id = "Iv1.abc"
client_secret = "${TETHER_IT_GITHUB_SECRET}"
redirect_uri = "https://app.example.com/oauth/github/callback"
scopes = ["repo", "read:user"]

[webhook]
endpoint = "/webhooks/github"
secret = "${TETHER_IT_WEBHOOK_SECRET}"
events = ["push", "pull_request"]

[webhook.retry]
max_retries = 5
backoff = "linear"
base_delay_ms = 500

[http]
timeout_ms = 10000
max_attempts = 2
"#;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_integration() {
    let file = write_temp(".toml", GITHUB_TOML);

    let config: IntegrationConfig = ConfigLoader::auto(file.path())
        .unwrap()
        .with_var("TETHER_IT_GITHUB_SECRET", "gh-secret")
        .with_var("TETHER_IT_WEBHOOK_SECRET", "whsec")
        .load(file.path())
        .unwrap();

    assert_eq!(config.name, "github");
    assert_eq!(config.provider, Platform::GitHub);

    let oauth = config.oauth_config().unwrap();
    assert_eq!(oauth.client_secret.as_deref(), Some("gh-secret"));
    assert_eq!(oauth.scopes, vec!["repo", "read:user"]);

    let webhook = config.webhook_config().unwrap().unwrap();
    assert_eq!(webhook.secret.as_deref(), Some("whsec"));
    assert_eq!(webhook.signature_method, SignatureMethod::HmacSha256);
    assert_eq!(webhook.retry_policy.max_retries, 5);
    assert_eq!(webhook.retry_policy.backoff, BackoffStrategy::Linear);
    assert_eq!(webhook.retry_policy.base_delay, Duration::from_millis(500));

    let http = config.http_client_config();
    assert_eq!(http.timeout, Duration::from_secs(10));
    assert_eq!(http.retry.map(|r| r.max_attempts), Some(2));
}

#[test]
fn test_load_json_custom_provider() {
    let file = write_temp(
        ".json",
        r#"{
            "name": "internal-sso",
            "provider": "custom",
            "oauth": {
                "client_id": "spa",
                "redirect_uri": "https://app.example.com/cb",
                "use_pkce": true,
                "authorize_url": "https://id.example.com/authorize",
                "token_url": "https://id.example.com/token",
                "params": {"prompt": "consent"}
            }
        }"#,
    );

    let config: IntegrationConfig = ConfigLoader::auto(file.path()).unwrap().load(file.path()).unwrap();

    assert_eq!(config.provider, Platform::Custom);
    assert!(config.webhook.is_none());
    let oauth = config.oauth_config().unwrap();
    assert!(oauth.use_pkce);
    assert!(oauth.client_secret.is_none());
    assert_eq!(oauth.extra_params.get("prompt").map(String::as_str), Some("consent"));
}

#[test]
fn test_missing_secret_variable_fails_load() {
    let file = write_temp(".toml", GITHUB_TOML);

    let err = ConfigLoader::auto(file.path())
        .unwrap()
        .with_var("TETHER_IT_GITHUB_SECRET", "gh-secret")
        .load::<IntegrationConfig>(file.path())
        .unwrap_err();

    assert!(matches!(err, ConfigError::MissingEnv(ref name) if name == "TETHER_IT_WEBHOOK_SECRET"));
}

#[test]
fn test_custom_provider_without_token_url_is_invalid() {
    let err = ConfigLoader::new(FileFormat::Json)
        .parse_as::<IntegrationConfig>(
            r#"{
                "name": "internal-sso",
                "provider": "custom",
                "oauth": {
                    "client_id": "spa",
                    "client_secret": "s",
                    "redirect_uri": "https://app.example.com/cb",
                    "authorize_url": "https://id.example.com/authorize"
                }
            }"#,
        )
        .unwrap_err();

    assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("token_url")));
}

#[test]
fn test_unknown_provider_is_rejected() {
    let err = ConfigLoader::new(FileFormat::Toml)
        .parse_as::<IntegrationConfig>("name = \"bb\"\nprovider = \"bitbucket\"\n")
        .unwrap_err();
    assert!(matches!(err, ConfigError::DeserializationError(_)));
}

#[test]
fn test_inverted_retry_delays_are_invalid() {
    let err = ConfigLoader::new(FileFormat::Toml)
        .parse_as::<IntegrationConfig>(
            r#"
            name = "github"
            provider = "github"

            [webhook]
            endpoint = "/webhooks/github"

            [webhook.retry]
            base_delay_ms = 90000
            max_delay_ms = 1000
            "#,
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("base_delay_ms")));
}

#[test]
fn test_dotenv_file_feeds_expansion() {
    let env = write_temp(".env", "TETHER_IT_DOTENV_SECRET=from-dotenv\n");
    ConfigLoader::load_dotenv(Some(env.path())).unwrap();

    let value = ConfigLoader::new(FileFormat::Json)
        .parse(r#"{"secret": "${TETHER_IT_DOTENV_SECRET}"}"#)
        .unwrap();
    assert_eq!(value["secret"], "from-dotenv");
}
