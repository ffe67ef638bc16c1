//! Per-integration webhook configuration and the public receiving surface

use crate::{ProcessOutcome, SignatureValidator, WebhookConfig, WebhookPayload, WebhookProcessor};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::{
    codes, lifecycle, ErrorInfo, IntegrationContext, IntegrationEvent, IntegrationEvents,
    IntegrationResult,
};
use tracing::{debug, info};

/// Owns webhook configurations by integration id and the shared processor
#[derive(Debug, Clone, Default)]
pub struct WebhookManager {
    configs: Arc<RwLock<HashMap<String, WebhookConfig>>>,
    processor: WebhookProcessor,
    events: IntegrationEvents,
}

impl WebhookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager that publishes lifecycle events on an existing bus
    pub fn with_events(events: IntegrationEvents) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Register or replace the configuration of an integration
    pub fn register(&self, integration_id: impl Into<String>, config: WebhookConfig) {
        let integration_id = integration_id.into();
        info!(integration = %integration_id, endpoint = %config.endpoint, "Registered webhook configuration");
        self.configs.write().insert(integration_id, config);
    }

    /// Remove the configuration of an integration
    pub fn unregister(&self, integration_id: &str) -> Option<WebhookConfig> {
        self.configs.write().remove(integration_id)
    }

    pub fn config(&self, integration_id: &str) -> Option<WebhookConfig> {
        self.configs.read().get(integration_id).cloned()
    }

    pub fn processor(&self) -> &WebhookProcessor {
        &self.processor
    }

    pub fn events(&self) -> &IntegrationEvents {
        &self.events
    }

    /// Receive a webhook for an integration.
    ///
    /// Header names are matched case-insensitively. Emits `webhook.received`
    /// on success and `webhook.failed` otherwise; listener failures never
    /// affect the returned result.
    pub async fn handle_webhook<I, K, V>(
        &self,
        integration_id: &str,
        headers: I,
        body: serde_json::Value,
        raw_body: impl Into<Vec<u8>>,
        context: IntegrationContext,
    ) -> IntegrationResult
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let Some(config) = self.config(integration_id) else {
            return no_config(integration_id);
        };

        let payload = WebhookPayload::new(headers, body, raw_body)
            .with_signature_from(&config.signature_header);

        let outcome = self.processor.process(&payload, &config, &context).await;
        self.publish(integration_id, &outcome, &context).await;
        outcome.result
    }

    /// Retry a recorded delivery of an integration with a freshly received payload
    pub async fn retry_webhook<I, K, V>(
        &self,
        integration_id: &str,
        delivery_id: &str,
        headers: I,
        body: serde_json::Value,
        raw_body: impl Into<Vec<u8>>,
        context: IntegrationContext,
    ) -> IntegrationResult
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let Some(config) = self.config(integration_id) else {
            return no_config(integration_id);
        };

        let payload = WebhookPayload::new(headers, body, raw_body)
            .with_signature_from(&config.signature_header);

        let result = self
            .processor
            .retry(delivery_id, &payload, &config, &context)
            .await;

        let outcome = ProcessOutcome {
            event: self.processor.delivery(delivery_id).map(|d| d.event),
            delivery_id: Some(delivery_id.to_string()),
            result,
        };
        self.publish(integration_id, &outcome, &context).await;
        outcome.result
    }

    /// Verify a signature with the integration's secret and method.
    ///
    /// Returns `false` when the integration or its secret is unknown.
    pub fn validate_signature(&self, integration_id: &str, payload: &[u8], signature: &str) -> bool {
        let configs = self.configs.read();
        let Some(config) = configs.get(integration_id) else {
            return false;
        };
        let Some(secret) = config.secret.as_deref() else {
            return false;
        };
        SignatureValidator::new(config.signature_method).verify(payload, signature, secret)
    }

    /// Sign a payload with the integration's secret and method
    pub fn generate_signature(&self, integration_id: &str, payload: &[u8]) -> Option<String> {
        let configs = self.configs.read();
        let config = configs.get(integration_id)?;
        let secret = config.secret.as_deref()?;
        Some(SignatureValidator::new(config.signature_method).generate(payload, secret))
    }

    async fn publish(&self, integration_id: &str, outcome: &ProcessOutcome, context: &IntegrationContext) {
        let (name, data) = if outcome.result.is_success() {
            (
                lifecycle::WEBHOOK_RECEIVED,
                json!({
                    "event": outcome.event,
                    "data": outcome.result.data,
                    "deliveryId": outcome.delivery_id,
                }),
            )
        } else {
            (
                lifecycle::WEBHOOK_FAILED,
                json!({
                    "event": outcome.event,
                    "error": outcome.result.error,
                    "deliveryId": outcome.delivery_id,
                }),
            )
        };

        let failed = self
            .events
            .emit(IntegrationEvent::new(name, integration_id, data, context.clone()))
            .await;
        if failed > 0 {
            debug!(integration = integration_id, event = name, failed, "Lifecycle listeners reported errors");
        }
    }
}

fn no_config(integration_id: &str) -> IntegrationResult {
    IntegrationResult::failure(
        ErrorInfo::new(
            codes::NO_CONFIG,
            format!("No webhook configuration for integration: {}", integration_id),
        )
        .retryable(false),
    )
}
