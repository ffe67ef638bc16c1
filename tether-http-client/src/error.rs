//! Failures of outbound provider calls

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HttpClientError>;

#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The whole call, retries excluded, ran past the client timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request body could not be serialized
    #[error("cannot encode request body: {0}")]
    Encode(String),

    /// A 4xx or 5xx answer, surfaced through `Response::error_for_status`
    #[error("provider answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("cannot decode response body: {0}")]
    Decode(String),

    /// Connection, TLS or protocol failure below HTTP semantics
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HttpClientError {
    /// Whether the same call could succeed a moment later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            Self::InvalidUrl(_) | Self::InvalidHeader(_) | Self::Encode(_) | Self::Decode(_) => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}
