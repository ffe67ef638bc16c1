//! Event dispatch, delivery tracking and retries

use crate::{
    DeliveryStatus, HandlerError, RetryPolicy, WebhookConfig, WebhookDelivery, WebhookHandler,
    WebhookPayload, WebhookValidator,
};
use chrono::Utc;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tether_core::{codes, ErrorInfo, IntegrationContext, IntegrationResult};
use tracing::{debug, error, info, warn};

/// Event name that routes to the catch-all handlers
pub const WILDCARD_EVENT: &str = "*";

type HandlerList = Vec<Arc<dyn WebhookHandler>>;

/// Result of processing a payload
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub result: IntegrationResult,

    /// Classified event, when validation got that far
    pub event: Option<String>,

    /// Id of the delivery record, when a handler was invoked
    pub delivery_id: Option<String>,
}

impl ProcessOutcome {
    fn rejected(result: IntegrationResult, event: Option<String>) -> Self {
        Self {
            result,
            event,
            delivery_id: None,
        }
    }
}

/// Routes validated payloads to handlers and tracks every delivery
#[derive(Clone, Default)]
pub struct WebhookProcessor {
    handlers: Arc<RwLock<HashMap<String, HandlerList>>>,
    fallback: Arc<RwLock<HandlerList>>,
    deliveries: Arc<DashMap<String, WebhookDelivery>>,
}

impl WebhookProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event; `"*"` registers a catch-all.
    ///
    /// Several handlers per event run in registration order.
    pub fn on<H>(&self, event: impl Into<String>, handler: H)
    where
        H: WebhookHandler + 'static,
    {
        let event = event.into();
        if event == WILDCARD_EVENT {
            self.on_any(handler);
            return;
        }
        debug!(event = %event, "Registering webhook handler");
        self.handlers
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Register a catch-all handler for events with no dedicated handler
    pub fn on_any<H>(&self, handler: H)
    where
        H: WebhookHandler + 'static,
    {
        debug!("Registering catch-all webhook handler");
        self.fallback.write().push(Arc::new(handler));
    }

    /// Remove every handler for an event; `"*"` clears the catch-all
    pub fn off(&self, event: &str) {
        if event == WILDCARD_EVENT {
            self.fallback.write().clear();
        } else {
            self.handlers.write().remove(event);
        }
    }

    /// Number of handlers registered for an event
    pub fn handler_count(&self, event: &str) -> usize {
        if event == WILDCARD_EVENT {
            return self.fallback.read().len();
        }
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    /// Validate, dispatch and record a payload
    pub async fn process(
        &self,
        payload: &WebhookPayload,
        config: &WebhookConfig,
        context: &IntegrationContext,
    ) -> ProcessOutcome {
        let (event, handlers) = match self.prepare(payload, config) {
            Ok(prepared) => prepared,
            Err((result, event)) => return ProcessOutcome::rejected(result, event),
        };

        let mut delivery = WebhookDelivery::new(&config.endpoint, &event, payload);
        let result = self.run(&event, &handlers, payload, context).await;

        let next_retry = next_retry_at(config, &result, 1);
        delivery.record_attempt(attempt_error(&result), next_retry);
        delivery.status = if result.is_success() {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Failed
        };

        let delivery_id = delivery.id.clone();
        info!(
            delivery_id = %delivery_id,
            event = %event,
            status = ?delivery.status,
            "Webhook processed"
        );
        self.deliveries.insert(delivery_id.clone(), delivery);

        ProcessOutcome {
            result,
            event: Some(event),
            delivery_id: Some(delivery_id),
        }
    }

    /// Re-run a recorded delivery after its backoff delay.
    ///
    /// The backoff index is the number of retries already made (attempts
    /// recorded minus the initial one), so the first retry waits
    /// `base_delay`. Total attempts never exceed `max_retries + 1`.
    pub async fn retry(
        &self,
        delivery_id: &str,
        payload: &WebhookPayload,
        config: &WebhookConfig,
        context: &IntegrationContext,
    ) -> IntegrationResult {
        let policy = &config.retry_policy;

        let (attempts, status) = match self.deliveries.get(delivery_id) {
            Some(delivery) => (delivery.attempt_count(), delivery.status),
            None => {
                return IntegrationResult::failure(
                    ErrorInfo::new(codes::DELIVERY_NOT_FOUND, "Webhook delivery not found")
                        .retryable(false),
                );
            }
        };

        if status == DeliveryStatus::Delivered {
            return IntegrationResult::failure(
                ErrorInfo::new(codes::ALREADY_DELIVERED, "Webhook delivery already succeeded")
                    .retryable(false),
            );
        }

        if attempts > policy.max_retries {
            self.set_status(delivery_id, DeliveryStatus::Failed);
            warn!(delivery_id, attempts, "Webhook delivery exhausted its retries");
            return IntegrationResult::failure(
                ErrorInfo::new(codes::MAX_RETRIES_EXCEEDED, "Maximum retry attempts exceeded")
                    .retryable(false),
            );
        }

        let delay = Self::compute_backoff(policy, attempts.saturating_sub(1));
        debug!(delivery_id, attempt = attempts + 1, delay_ms = delay.as_millis() as u64, "Retrying webhook delivery");
        tokio::time::sleep(delay).await;

        self.set_status(delivery_id, DeliveryStatus::Retrying);

        let result = match self.prepare(payload, config) {
            Ok((event, handlers)) => self.run(&event, &handlers, payload, context).await,
            Err((result, _)) => result,
        };

        let next_retry = next_retry_at(config, &result, attempts + 1);
        if let Some(mut delivery) = self.deliveries.get_mut(delivery_id) {
            delivery.record_attempt(attempt_error(&result), next_retry);
            delivery.status = if result.is_success() {
                DeliveryStatus::Delivered
            } else if result.disallows_retry() {
                DeliveryStatus::Failed
            } else {
                DeliveryStatus::Retrying
            };
            info!(
                delivery_id,
                attempt = delivery.attempt_count(),
                status = ?delivery.status,
                "Webhook retry finished"
            );
        }

        result
    }

    /// Snapshot of one delivery
    pub fn delivery(&self, id: &str) -> Option<WebhookDelivery> {
        self.deliveries.get(id).map(|d| d.value().clone())
    }

    /// Snapshot of every delivery, oldest first
    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        let mut all: Vec<WebhookDelivery> =
            self.deliveries.iter().map(|d| d.value().clone()).collect();
        all.sort_by_key(|d| d.timestamp);
        all
    }

    /// Deliveries currently in a given status, oldest first
    pub fn deliveries_with_status(&self, status: DeliveryStatus) -> Vec<WebhookDelivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.status == status)
            .collect()
    }

    /// Delay a driver should wait before the retry with 0-based index `attempt`
    pub fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
        policy.delay_for_attempt(attempt)
    }

    fn set_status(&self, delivery_id: &str, status: DeliveryStatus) {
        if let Some(mut delivery) = self.deliveries.get_mut(delivery_id) {
            delivery.status = status;
        }
    }

    /// Validate and resolve handlers; on failure returns the result and any classified event
    fn prepare(
        &self,
        payload: &WebhookPayload,
        config: &WebhookConfig,
    ) -> Result<(String, HandlerList), (IntegrationResult, Option<String>)> {
        let verdict = WebhookValidator::validate(payload, config);
        if !verdict.valid {
            let message = verdict.error.unwrap_or_else(|| "validation failed".to_string());
            warn!(endpoint = %config.endpoint, reason = %message, "Webhook rejected");
            let result = IntegrationResult::failure(
                ErrorInfo::new(codes::VALIDATION_FAILED, message).retryable(false),
            );
            return Err((result, verdict.event));
        }

        let Some(event) = verdict.event else {
            warn!(endpoint = %config.endpoint, "Webhook event type could not be determined");
            let result = IntegrationResult::failure(
                ErrorInfo::new(codes::NO_EVENT_TYPE, "Could not determine webhook event type")
                    .retryable(false),
            );
            return Err((result, None));
        };

        match self.resolve(&event) {
            Some(handlers) => Ok((event, handlers)),
            None => {
                warn!(event = %event, "No webhook handler registered");
                let result = IntegrationResult::failure(
                    ErrorInfo::new(codes::NO_HANDLER, format!("No handler for event: {}", event))
                        .retryable(false),
                );
                Err((result, Some(event)))
            }
        }
    }

    fn resolve(&self, event: &str) -> Option<HandlerList> {
        if let Some(handlers) = self.handlers.read().get(event) {
            if !handlers.is_empty() {
                return Some(handlers.clone());
            }
        }
        let fallback = self.fallback.read();
        (!fallback.is_empty()).then(|| fallback.clone())
    }

    /// Invoke handlers in order; the first failure short-circuits
    async fn run(
        &self,
        event: &str,
        handlers: &[Arc<dyn WebhookHandler>],
        payload: &WebhookPayload,
        context: &IntegrationContext,
    ) -> IntegrationResult {
        match invoke(handlers, payload, context).await {
            Ok(result) => result,
            Err(err) => {
                error!(event, error = %err, "Webhook handler failed");
                IntegrationResult::failure(
                    ErrorInfo::new(codes::PROCESSING_ERROR, err.to_string())
                        .with_details(json!({ "event": event }))
                        .retryable(true),
                )
                .with_should_retry(true)
            }
        }
    }
}

async fn invoke(
    handlers: &[Arc<dyn WebhookHandler>],
    payload: &WebhookPayload,
    context: &IntegrationContext,
) -> Result<IntegrationResult, HandlerError> {
    let mut last = IntegrationResult::ok_empty();
    for handler in handlers {
        let result = AssertUnwindSafe(handler.handle(payload, context))
            .catch_unwind()
            .await
            .map_err(|_| HandlerError::from("webhook handler panicked"))??;
        if !result.is_success() {
            return Ok(result);
        }
        last = result;
    }
    Ok(last)
}

fn attempt_error(result: &IntegrationResult) -> String {
    result.error_message().unwrap_or_default().to_string()
}

/// When the attempt numbered `attempt` failed and may be retried, the expected retry time
fn next_retry_at(
    config: &WebhookConfig,
    result: &IntegrationResult,
    attempt: u32,
) -> Option<chrono::DateTime<Utc>> {
    let policy = &config.retry_policy;
    if result.is_success() || result.disallows_retry() || attempt > policy.max_retries {
        return None;
    }
    let delay = policy.delay_for_attempt(attempt - 1);
    chrono::Duration::from_std(delay)
        .ok()
        .map(|delay| Utc::now() + delay)
}

impl fmt::Debug for WebhookProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookProcessor")
            .field("events", &self.handlers.read().keys().collect::<Vec<_>>())
            .field("fallback_handlers", &self.fallback.read().len())
            .field("deliveries", &self.deliveries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn push_payload() -> WebhookPayload {
        WebhookPayload::new([("x-github-event", "push")], json!({"ref": "main"}), b"{}".to_vec())
    }

    fn config() -> WebhookConfig {
        WebhookConfig::builder("https://example.com/hooks")
            .retry_policy(RetryPolicy::linear(2, Duration::from_millis(100), Duration::from_secs(1)))
            .build()
    }

    #[tokio::test]
    async fn test_dispatches_to_registered_handler() {
        let processor = WebhookProcessor::new();
        processor.on(
            "push",
            handler_fn(|payload: WebhookPayload, _ctx| async move {
                Ok(IntegrationResult::ok(json!({ "ref": payload.body["ref"] })))
            }),
        );

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;

        assert!(outcome.result.is_success());
        assert_eq!(outcome.result.data, Some(json!({"ref": "main"})));
        assert_eq!(outcome.event.as_deref(), Some("push"));

        let delivery = processor.delivery(outcome.delivery_id.as_deref().unwrap()).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Delivered);
        assert_eq!(delivery.attempts.len(), 1);
        assert_eq!(delivery.attempts[0].error, "");
        assert!(delivery.attempts[0].next_retry.is_none());
    }

    #[tokio::test]
    async fn test_no_handler_creates_no_delivery() {
        let processor = WebhookProcessor::new();
        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;

        assert_eq!(outcome.result.error_code(), Some(codes::NO_HANDLER));
        assert!(outcome.delivery_id.is_none());
        assert!(processor.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_no_event_type() {
        let processor = WebhookProcessor::new();
        processor.on_any(handler_fn(|_, _| async { Ok(IntegrationResult::ok_empty()) }));
        let payload = WebhookPayload::new(Vec::<(String, String)>::new(), json!({"x": 1}), b"{}".to_vec());

        let outcome = processor.process(&payload, &config(), &IntegrationContext::new()).await;
        assert_eq!(outcome.result.error_code(), Some(codes::NO_EVENT_TYPE));
        assert!(processor.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_catch_all_handles_unknown_events() {
        let processor = WebhookProcessor::new();
        processor.on("*", handler_fn(|_, _| async { Ok(IntegrationResult::ok(json!("fallback"))) }));

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;
        assert_eq!(outcome.result.data, Some(json!("fallback")));
        assert_eq!(processor.handler_count("*"), 1);

        processor.off("*");
        assert_eq!(processor.handler_count("*"), 0);
    }

    #[tokio::test]
    async fn test_specific_handler_wins_over_catch_all() {
        let processor = WebhookProcessor::new();
        processor.on_any(handler_fn(|_, _| async { Ok(IntegrationResult::ok(json!("fallback"))) }));
        processor.on("push", handler_fn(|_, _| async { Ok(IntegrationResult::ok(json!("push"))) }));

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;
        assert_eq!(outcome.result.data, Some(json!("push")));
    }

    #[tokio::test]
    async fn test_handlers_run_in_order_and_short_circuit() {
        let processor = WebhookProcessor::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        processor.on(
            "push",
            handler_fn(move |_, _| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(IntegrationResult::fail("DOWNSTREAM", "rejected").with_should_retry(false))
                }
            }),
        );
        let c = calls.clone();
        processor.on(
            "push",
            handler_fn(move |_, _| {
                let c = c.clone();
                async move {
                    c.fetch_add(10, Ordering::SeqCst);
                    Ok(IntegrationResult::ok_empty())
                }
            }),
        );

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.result.error_code(), Some("DOWNSTREAM"));
        assert_eq!(outcome.result.should_retry, Some(false));

        let delivery = processor.delivery(outcome.delivery_id.as_deref().unwrap()).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Failed);
        assert_eq!(delivery.attempts[0].error, "rejected");
        assert!(delivery.attempts[0].next_retry.is_none());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_processing_error() {
        let processor = WebhookProcessor::new();
        processor.on("push", handler_fn(|_, _| async { Err(HandlerError::from("db down")) }));

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;

        let error = outcome.result.error.clone().unwrap();
        assert_eq!(error.code, codes::PROCESSING_ERROR);
        assert_eq!(error.message, "db down");
        assert_eq!(error.retryable, Some(true));
        assert_eq!(outcome.result.should_retry, Some(true));

        let delivery = processor.delivery(outcome.delivery_id.as_deref().unwrap()).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Failed);
        assert_eq!(delivery.attempts[0].error, "db down");
        assert!(delivery.attempts[0].next_retry.is_some());
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let processor = WebhookProcessor::new();
        processor.on(
            "push",
            handler_fn(|payload: WebhookPayload, _| async move {
                if payload.body["ref"] == "main" {
                    panic!("handler bug");
                }
                Ok(IntegrationResult::ok_empty())
            }),
        );

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;
        assert_eq!(outcome.result.error_code(), Some(codes::PROCESSING_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_unknown_delivery() {
        let processor = WebhookProcessor::new();
        let result = processor
            .retry("missing", &push_payload(), &config(), &IntegrationContext::new())
            .await;
        assert_eq!(result.error_code(), Some(codes::DELIVERY_NOT_FOUND));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delivered_is_rejected() {
        let processor = WebhookProcessor::new();
        processor.on("push", handler_fn(|_, _| async { Ok(IntegrationResult::ok_empty()) }));
        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;

        let result = processor
            .retry(
                outcome.delivery_id.as_deref().unwrap(),
                &push_payload(),
                &config(),
                &IntegrationContext::new(),
            )
            .await;
        assert_eq!(result.error_code(), Some(codes::ALREADY_DELIVERED));
        assert!(result.disallows_retry());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let processor = WebhookProcessor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        processor.on(
            "push",
            handler_fn(move |_, _| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(HandlerError::from("transient"))
                    } else {
                        Ok(IntegrationResult::ok(json!("done")))
                    }
                }
            }),
        );

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;
        let id = outcome.delivery_id.unwrap();

        let started = tokio::time::Instant::now();
        let result = processor
            .retry(&id, &push_payload(), &config(), &IntegrationContext::new())
            .await;

        assert!(result.is_success());
        // First retry waits exactly the base delay
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(started.elapsed() < Duration::from_millis(200));

        let delivery = processor.delivery(&id).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Delivered);
        assert_eq!(delivery.attempts.len(), 2);
        assert_eq!(delivery.attempts[1].attempt, 2);
        assert_eq!(processor.deliveries_with_status(DeliveryStatus::Delivered).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_enforced() {
        let processor = WebhookProcessor::new();
        processor.on("push", handler_fn(|_, _| async { Err(HandlerError::from("still down")) }));
        let config = config();

        let outcome = processor
            .process(&push_payload(), &config, &IntegrationContext::new())
            .await;
        let id = outcome.delivery_id.unwrap();

        for _ in 0..config.retry_policy.max_retries {
            let result = processor
                .retry(&id, &push_payload(), &config, &IntegrationContext::new())
                .await;
            assert_eq!(result.error_code(), Some(codes::PROCESSING_ERROR));
            assert_eq!(processor.delivery(&id).unwrap().status, DeliveryStatus::Retrying);
        }

        let delivery = processor.delivery(&id).unwrap();
        assert_eq!(delivery.attempts.len() as u32, config.retry_policy.max_retries + 1);
        assert!(delivery.last_attempt().unwrap().next_retry.is_none());

        let result = processor
            .retry(&id, &push_payload(), &config, &IntegrationContext::new())
            .await;
        assert_eq!(result.error_code(), Some(codes::MAX_RETRIES_EXCEEDED));

        let delivery = processor.delivery(&id).unwrap();
        assert_eq!(delivery.status, DeliveryStatus::Failed);
        assert_eq!(delivery.attempts.len() as u32, config.retry_policy.max_retries + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_non_retryable_result_fails_delivery() {
        let processor = WebhookProcessor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        processor.on(
            "push",
            handler_fn(move |_, _| {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(HandlerError::from("transient"))
                    } else {
                        Ok(IntegrationResult::fail("GONE", "resource deleted").with_should_retry(false))
                    }
                }
            }),
        );

        let outcome = processor
            .process(&push_payload(), &config(), &IntegrationContext::new())
            .await;
        let id = outcome.delivery_id.unwrap();
        let result = processor
            .retry(&id, &push_payload(), &config(), &IntegrationContext::new())
            .await;

        assert_eq!(result.error_code(), Some("GONE"));
        assert_eq!(processor.delivery(&id).unwrap().status, DeliveryStatus::Failed);
    }
}
