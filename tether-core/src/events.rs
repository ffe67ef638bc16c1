//! Integration level lifecycle events

use crate::IntegrationContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// An event announced to integration subscribers
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Event name, e.g. `webhook.received`
    pub name: String,

    /// Name of the integration that emitted the event
    pub integration: String,

    /// Event data
    pub data: serde_json::Value,

    /// Context of the operation that triggered the event
    pub context: IntegrationContext,

    pub timestamp: DateTime<Utc>,
}

impl IntegrationEvent {
    /// Create a new event
    pub fn new(
        name: impl Into<String>,
        integration: impl Into<String>,
        data: serde_json::Value,
        context: IntegrationContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            integration: integration.into(),
            data,
            context,
            timestamp: Utc::now(),
        }
    }
}

/// Error raised by a listener
#[derive(Debug, thiserror::Error)]
#[error("Listener failed: {0}")]
pub struct ListenerError(pub String);

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Subscriber to integration events
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &IntegrationEvent) -> Result<(), ListenerError>;
}

/// Listener backed by an async closure, see [`listener_fn`]
pub struct FnListener<F>(F);

/// Wrap an async closure as an [`EventListener`]
pub fn listener_fn<F, Fut>(f: F) -> FnListener<F>
where
    F: Fn(IntegrationEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send,
{
    FnListener(f)
}

#[async_trait]
impl<F, Fut> EventListener for FnListener<F>
where
    F: Fn(IntegrationEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send,
{
    async fn on_event(&self, event: &IntegrationEvent) -> Result<(), ListenerError> {
        (self.0)(event.clone()).await
    }
}

/// Per-integration registry of event listeners.
///
/// Listener failures never propagate out of [`IntegrationEvents::emit`].
#[derive(Clone, Default)]
pub struct IntegrationEvents {
    listeners: Arc<DashMap<String, Vec<Arc<dyn EventListener>>>>,
}

impl IntegrationEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to an event name
    pub fn subscribe<L>(&self, name: impl Into<String>, listener: L)
    where
        L: EventListener + 'static,
    {
        let name = name.into();
        debug!(event = %name, "Subscribed integration event listener");
        self.listeners
            .entry(name)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Remove all listeners of an event name
    pub fn unsubscribe(&self, name: &str) {
        self.listeners.remove(name);
    }

    /// Number of listeners for an event name
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map(|l| l.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }

    /// Deliver an event to its listeners in subscription order.
    ///
    /// Returns the number of listeners that failed or panicked.
    pub async fn emit(&self, event: IntegrationEvent) -> usize {
        // Snapshot so no map guard is held across an await
        let listeners = match self.listeners.get(&event.name) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut failed = 0;
        for listener in listeners {
            match AssertUnwindSafe(listener.on_event(&event))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    error!(event = %event.name, integration = %event.integration, error = %e, "Event listener failed");
                }
                Err(_) => {
                    failed += 1;
                    error!(event = %event.name, integration = %event.integration, "Event listener panicked");
                }
            }
        }

        failed
    }
}

impl std::fmt::Debug for IntegrationEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationEvents")
            .field("events", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(name: &str) -> IntegrationEvent {
        IntegrationEvent::new(
            name,
            "github",
            serde_json::json!({"event": "push"}),
            IntegrationContext::default(),
        )
    }

    #[tokio::test]
    async fn test_emit_reaches_listeners_in_order() {
        let events = IntegrationEvents::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            events.subscribe(
                "webhook.received",
                listener_fn(move |_| {
                    let order = order.clone();
                    async move {
                        order.lock().unwrap().push(i);
                        Ok(())
                    }
                }),
            );
        }

        let failed = events.emit(event("webhook.received")).await;
        assert_eq!(failed, 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_listener_errors_are_swallowed() {
        let events = IntegrationEvents::new();
        let calls = Arc::new(AtomicUsize::new(0));

        events.subscribe(
            "webhook.failed",
            listener_fn(|_| async { Err::<(), _>(ListenerError::from("subscriber broke")) }),
        );
        let counter = calls.clone();
        events.subscribe(
            "webhook.failed",
            listener_fn(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        let failed = events.emit(event("webhook.failed")).await;
        assert_eq!(failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listener_panics_are_contained() {
        let events = IntegrationEvents::new();
        events.subscribe(
            "oauth.completed",
            listener_fn(|event: IntegrationEvent| async move {
                if event.name == "oauth.completed" {
                    panic!("listener exploded");
                }
                Ok(())
            }),
        );

        assert_eq!(events.emit(event("oauth.completed")).await, 1);
    }

    #[tokio::test]
    async fn test_emit_without_listeners() {
        let events = IntegrationEvents::new();
        assert_eq!(events.emit(event("nothing")).await, 0);
    }

    #[test]
    fn test_unsubscribe() {
        let events = IntegrationEvents::new();
        events.subscribe("a", listener_fn(|_| async { Ok(()) }));
        events.subscribe("a", listener_fn(|_| async { Ok(()) }));
        assert_eq!(events.listener_count("a"), 2);

        events.unsubscribe("a");
        assert_eq!(events.listener_count("a"), 0);
    }
}
