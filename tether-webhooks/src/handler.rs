//! Webhook handler trait and closure adapter

use crate::WebhookPayload;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use tether_core::{IntegrationContext, IntegrationResult};
use thiserror::Error;

/// Error raised by a handler; becomes a retryable `PROCESSING_ERROR`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Application logic attached to an event name.
///
/// Returning `Ok` with a failed result reports a handled failure verbatim.
/// Returning `Err` reports an unexpected failure that may be retried.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(
        &self,
        payload: &WebhookPayload,
        context: &IntegrationContext,
    ) -> Result<IntegrationResult, HandlerError>;
}

/// Handler backed by an async closure
pub struct FnHandler<F>(F);

/// Wrap an async closure as a [`WebhookHandler`]
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(WebhookPayload, IntegrationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<IntegrationResult, HandlerError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookPayload, IntegrationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<IntegrationResult, HandlerError>> + Send,
{
    async fn handle(
        &self,
        payload: &WebhookPayload,
        context: &IntegrationContext,
    ) -> Result<IntegrationResult, HandlerError> {
        (self.0)(payload.clone(), context.clone()).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}
