//! Structural, signature and allow-list validation of inbound payloads

use crate::{SignatureValidator, WebhookConfig, WebhookPayload};
use serde::Serialize;
use tracing::debug;

/// Headers consulted for the event name, in priority order
pub const EVENT_HEADERS: [&str; 5] = [
    "x-github-event",
    "x-gitlab-event",
    "x-event-key",
    "x-event-type",
    "event-type",
];

/// Body fields consulted when no event header is present, in priority order
pub const EVENT_BODY_FIELDS: [&str; 4] = ["event_type", "type", "action", "event"];

/// Outcome of validating a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Classified event, when one could be determined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl ValidationVerdict {
    fn accept(event: Option<String>) -> Self {
        Self {
            valid: true,
            error: None,
            event,
        }
    }

    fn reject(error: impl Into<String>, event: Option<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            event,
        }
    }
}

/// Stateless payload validator
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookValidator;

impl WebhookValidator {
    /// Validate a payload against an integration's configuration.
    ///
    /// A payload without a signature passes even when a secret is configured.
    /// Providers that always sign should be paired with a handler that
    /// rejects unsigned input.
    pub fn validate(payload: &WebhookPayload, config: &WebhookConfig) -> ValidationVerdict {
        if !payload.has_body() {
            return ValidationVerdict::reject("missing required payload data", None);
        }

        let event = Self::classify_event(payload);

        if let Some(secret) = config.secret.as_deref() {
            match payload.signature.as_deref() {
                Some(signature) => {
                    let validator = SignatureValidator::new(config.signature_method);
                    if !validator.verify(&payload.raw_body, signature, secret) {
                        return ValidationVerdict::reject("invalid signature", event);
                    }
                }
                None => {
                    debug!(
                        endpoint = %config.endpoint,
                        "secret configured but no signature supplied; skipping verification"
                    );
                }
            }
        }

        if let Some(name) = event.as_deref() {
            if !config.accepts(name) {
                let message = format!("unsupported event type: {}", name);
                return ValidationVerdict::reject(message, event);
            }
        }

        ValidationVerdict::accept(event)
    }

    /// Determine the event name from headers, then from body fields
    pub fn classify_event(payload: &WebhookPayload) -> Option<String> {
        let from_header = EVENT_HEADERS
            .iter()
            .filter_map(|name| payload.header(name))
            .find(|value| !value.is_empty());

        if let Some(event) = from_header {
            return Some(event.to_string());
        }

        EVENT_BODY_FIELDS
            .iter()
            .filter_map(|field| payload.body.get(field).and_then(|v| v.as_str()))
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(headers: &[(&str, &str)], body: serde_json::Value) -> WebhookPayload {
        let raw = serde_json::to_vec(&body).unwrap();
        WebhookPayload::new(headers.iter().copied(), body, raw)
    }

    #[test]
    fn test_header_priority() {
        let p = payload(
            &[("X-Event-Type", "third"), ("X-GitLab-Event", "second"), ("X-GitHub-Event", "first")],
            json!({"type": "body"}),
        );
        assert_eq!(WebhookValidator::classify_event(&p).as_deref(), Some("first"));

        let p = payload(&[("event-type", "last")], json!({}));
        assert_eq!(WebhookValidator::classify_event(&p).as_deref(), Some("last"));
    }

    #[test]
    fn test_body_field_fallback() {
        let p = payload(&[], json!({"action": "opened", "event": "issue"}));
        assert_eq!(WebhookValidator::classify_event(&p).as_deref(), Some("opened"));

        let p = payload(&[], json!({"event": "deployment.created", "type": 7}));
        assert_eq!(WebhookValidator::classify_event(&p).as_deref(), Some("deployment.created"));

        let p = payload(&[], json!({"unrelated": true}));
        assert_eq!(WebhookValidator::classify_event(&p), None);
    }

    #[test]
    fn test_missing_body() {
        let p = WebhookPayload::new([("x-github-event", "push")], serde_json::Value::Null, Vec::new());
        let verdict = WebhookValidator::validate(&p, &WebhookConfig::default());
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("missing required payload data"));
    }

    #[test]
    fn test_valid_and_invalid_signature() {
        let config = WebhookConfig::builder("https://example.com").secret("s3cr3t").build();
        let body = json!({"zen": "Keep it simple"});
        let raw = serde_json::to_vec(&body).unwrap();
        let signature = SignatureValidator::default().generate(&raw, "s3cr3t");

        let good = WebhookPayload::new([("x-github-event", "ping")], body.clone(), raw.clone())
            .with_signature(signature);
        assert!(WebhookValidator::validate(&good, &config).valid);

        let bad = WebhookPayload::new([("x-github-event", "ping")], body, raw)
            .with_signature("sha256=0000");
        let verdict = WebhookValidator::validate(&bad, &config);
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("invalid signature"));
    }

    #[test]
    fn test_missing_signature_is_permitted() {
        let config = WebhookConfig::builder("https://example.com").secret("s3cr3t").build();
        let p = payload(&[("x-github-event", "push")], json!({"ref": "main"}));
        let verdict = WebhookValidator::validate(&p, &config);
        assert!(verdict.valid);
        assert_eq!(verdict.event.as_deref(), Some("push"));
    }

    #[test]
    fn test_event_allow_list() {
        let config = WebhookConfig::builder("https://example.com")
            .events(["push"])
            .build();

        let p = payload(&[("x-github-event", "issues")], json!({}));
        let verdict = WebhookValidator::validate(&p, &config);
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("unsupported event type: issues"));

        let p = payload(&[("x-github-event", "push")], json!({}));
        assert!(WebhookValidator::validate(&p, &config).valid);
    }

    #[test]
    fn test_unclassified_event_passes_validation() {
        let config = WebhookConfig::builder("https://example.com").events(["push"]).build();
        let p = payload(&[], json!({"hello": "world"}));
        let verdict = WebhookValidator::validate(&p, &config);
        assert!(verdict.valid);
        assert!(verdict.event.is_none());
    }
}
