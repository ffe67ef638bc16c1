//! Inbound payload and delivery record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An inbound webhook as received from a provider
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    /// Request headers with lower-cased names
    pub headers: HashMap<String, String>,

    /// Parsed request body, `Null` when absent
    pub body: serde_json::Value,

    /// Body bytes exactly as received, used for signature checks
    #[serde(skip)]
    pub raw_body: Vec<u8>,

    /// Signature extracted from the configured header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Receipt time
    pub timestamp: DateTime<Utc>,
}

impl WebhookPayload {
    /// Build a payload, normalizing header names to lower case
    pub fn new<I, K, V>(headers: I, body: serde_json::Value, raw_body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body,
            raw_body: raw_body.into(),
            signature: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the extracted signature
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Take the signature from a header, if present.
    ///
    /// Leading and trailing whitespace is stripped here, as header parsers
    /// differ on it; verification itself compares the exact string.
    pub fn with_signature_from(mut self, header: &str) -> Self {
        self.signature = self.header(header).map(|value| value.trim().to_string());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether a body was supplied
    pub fn has_body(&self) -> bool {
        !self.body.is_null()
    }
}

/// Lifecycle state of an inbound delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
    Retrying,
}

impl DeliveryStatus {
    /// Check if the delivery has settled (delivered or failed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

/// One processing attempt of a delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub attempt: u32,

    pub timestamp: DateTime<Utc>,

    /// Handler error message, empty on success or when the handler gave none
    pub error: String,

    /// When the next retry is expected, if one is warranted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry: Option<DateTime<Utc>>,
}

/// Record of one inbound webhook and its processing attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDelivery {
    pub id: String,

    /// Endpoint of the integration that received it
    pub endpoint: String,

    /// Classified event name
    pub event: String,

    pub payload: serde_json::Value,

    pub headers: HashMap<String, String>,

    pub timestamp: DateTime<Utc>,

    pub status: DeliveryStatus,

    /// Attempts in chronological order
    pub attempts: Vec<RetryAttempt>,
}

impl WebhookDelivery {
    /// Create a pending delivery record for a payload
    pub fn new(endpoint: impl Into<String>, event: impl Into<String>, payload: &WebhookPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint: endpoint.into(),
            event: event.into(),
            payload: payload.body.clone(),
            headers: payload.headers.clone(),
            timestamp: payload.timestamp,
            status: DeliveryStatus::Pending,
            attempts: Vec::new(),
        }
    }

    /// Append an attempt, numbering it after the existing ones
    pub fn record_attempt(&mut self, error: impl Into<String>, next_retry: Option<DateTime<Utc>>) {
        self.attempts.push(RetryAttempt {
            attempt: self.attempts.len() as u32 + 1,
            timestamp: Utc::now(),
            error: error.into(),
            next_retry,
        });
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn last_attempt(&self) -> Option<&RetryAttempt> {
        self.attempts.last()
    }
}
