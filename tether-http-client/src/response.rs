//! Fully buffered provider responses

use crate::{HttpClientError, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// Error bodies are cut to this many characters before landing in an error
const ERROR_BODY_LIMIT: usize = 512;

/// A provider response with its body already read.
///
/// Token and user-info payloads are small, so buffering lets callers inspect
/// the body (for platform error fields) and still check the status afterwards.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self { status, headers, body })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; missing and non-ASCII values both give `None`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|e| HttpClientError::Decode(e.to_string()))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| HttpClientError::Decode(e.to_string()))
    }

    /// Keep 1xx-3xx responses, turn 4xx and 5xx into `HttpClientError::Status`
    pub fn error_for_status(self) -> Result<Self> {
        if !(self.status.is_client_error() || self.status.is_server_error()) {
            return Ok(self);
        }
        let body = String::from_utf8_lossy(&self.body)
            .chars()
            .take(ERROR_BODY_LIMIT)
            .collect();
        Err(HttpClientError::Status {
            status: self.status,
            body,
        })
    }
}
