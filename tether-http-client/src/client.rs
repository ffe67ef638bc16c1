//! Shared client and the retry loop

use crate::request::Prepared;
use crate::{HttpClientConfig, HttpClientError, OutboundRequest, Response, Result};
use http::header::USER_AGENT;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outbound HTTP client shared by every provider of an integration.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
}

impl HttpClient {
    /// Fails when a configured default header is not a valid HTTP header
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .default_headers(default_headers(&config)?)
            .build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    pub fn default_client() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn get(&self, url: impl AsRef<str>) -> OutboundRequest<'_> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl AsRef<str>) -> OutboundRequest<'_> {
        self.request(Method::POST, url)
    }

    pub fn delete(&self, url: impl AsRef<str>) -> OutboundRequest<'_> {
        self.request(Method::DELETE, url)
    }

    pub fn request(&self, method: Method, url: impl AsRef<str>) -> OutboundRequest<'_> {
        OutboundRequest::new(self, method, url.as_ref())
    }

    pub(crate) async fn dispatch(&self, prepared: &Prepared) -> Result<Response> {
        let Some(retry) = &self.config.retry else {
            return self.attempt(prepared).await;
        };

        let mut attempt = 0;
        loop {
            let last = attempt + 1 >= retry.max_attempts;
            let outcome = self.attempt(prepared).await;

            let reason = match &outcome {
                Ok(response) if !last && retry.retries_status(response.status().as_u16()) => {
                    response.status().to_string()
                }
                Err(e) if !last && retry.retries_error(e) => e.to_string(),
                _ => return outcome,
            };

            let delay = retry.delay(attempt);
            debug!(
                method = %prepared.method,
                url = %prepared.url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                %reason,
                "Retrying outbound request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, prepared: &Prepared) -> Result<Response> {
        match self.inner.execute(prepared.to_reqwest()).await {
            Ok(response) => Response::read(response).await,
            Err(e) if e.is_timeout() => {
                warn!(url = %prepared.url, timeout = ?self.config.timeout, "Outbound request timed out");
                Err(HttpClientError::Timeout(self.config.timeout))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn default_headers(config: &HttpClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|_| HttpClientError::InvalidHeader(USER_AGENT.to_string()))?;
    headers.insert(USER_AGENT, user_agent);

    for (name, value) in &config.default_headers {
        let invalid = || HttpClientError::InvalidHeader(name.clone());
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(name, value);
    }
    Ok(headers)
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
