//! Building outbound requests

use crate::{HttpClient, HttpClientError, Response, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::Url;

/// A request under construction.
///
/// Setters never fail; the first problem (bad URL, bad header, unencodable
/// body) is kept and returned from `send`, so call chains stay linear.
#[must_use = "requests do nothing until `send` is awaited"]
pub struct OutboundRequest<'a> {
    client: &'a HttpClient,
    method: Method,
    url: std::result::Result<Url, url::ParseError>,
    headers: HeaderMap,
    body: Option<Bytes>,
    failure: Option<HttpClientError>,
}

impl<'a> OutboundRequest<'a> {
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: &str) -> Self {
        Self {
            client,
            method,
            url: Url::parse(url),
            headers: HeaderMap::new(),
            body: None,
            failure: None,
        }
    }

    fn fail(&mut self, error: HttpClientError) {
        self.failure.get_or_insert(error);
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(HttpClientError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Ask for a JSON answer; some token endpoints default to form encoding
    pub fn accept_json(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        self
    }

    /// Append one query pair, keeping any already in the URL
    pub fn query(mut self, key: &str, value: &str) -> Self {
        if let Ok(url) = self.url.as_mut() {
            url.query_pairs_mut().append_pair(key, value);
        }
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let encoded = serde_json::to_vec(body).map_err(|e| e.to_string());
        self.with_body(encoded, "application/json")
    }

    /// `application/x-www-form-urlencoded` body, the encoding OAuth token endpoints expect
    pub fn form<T: Serialize + ?Sized>(self, fields: &T) -> Self {
        let encoded = serde_urlencoded::to_string(fields)
            .map(String::into_bytes)
            .map_err(|e| e.to_string());
        self.with_body(encoded, "application/x-www-form-urlencoded")
    }

    fn with_body(
        mut self,
        encoded: std::result::Result<Vec<u8>, String>,
        content_type: &'static str,
    ) -> Self {
        match encoded {
            Ok(bytes) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                self.body = Some(Bytes::from(bytes));
            }
            Err(e) => self.fail(HttpClientError::Encode(e)),
        }
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Client credentials in the `Authorization` header; a missing secret
    /// encodes as an empty password
    pub fn basic_auth(self, client_id: &str, secret: Option<&str>) -> Self {
        let credentials = STANDARD.encode(format!("{client_id}:{}", secret.unwrap_or("")));
        self.header(AUTHORIZATION, format!("Basic {credentials}"))
    }

    pub async fn send(self) -> Result<Response> {
        let url = self.url?;
        if let Some(failure) = self.failure {
            return Err(failure);
        }

        let prepared = Prepared {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        };
        self.client.dispatch(&prepared).await
    }
}

/// Everything needed to produce the request again for each attempt.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) method: Method,
    pub(crate) url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Prepared {
    pub(crate) fn to_reqwest(&self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if let Some(body) = &self.body {
            *request.body_mut() = Some(body.clone().into());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::default_client().unwrap()
    }

    #[test]
    fn test_query_pairs_are_appended() {
        let client = client();
        let request = client
            .get("https://api.example.com/search?q=tether")
            .query("page", "2")
            .query("scope", "read user");
        assert_eq!(
            request.url.unwrap().as_str(),
            "https://api.example.com/search?q=tether&page=2&scope=read+user"
        );
    }

    #[test]
    fn test_basic_auth_without_secret() {
        let client = client();
        let request = client.post("https://id.example.com/revoke").basic_auth("spa", None);
        // base64("spa:")
        assert_eq!(request.headers[AUTHORIZATION], "Basic c3BhOg==");
    }

    #[test]
    fn test_first_failure_is_kept() {
        let client = client();
        let request = client
            .get("https://api.example.com")
            .header("bad header", "x")
            .header("x-ok", "bad\nvalue");
        assert!(matches!(request.failure, Some(HttpClientError::InvalidHeader(ref n)) if n == "bad header"));
    }

    #[test]
    fn test_form_sets_content_type() {
        let client = client();
        let request = client
            .post("https://id.example.com/token")
            .form(&[("grant_type", "authorization_code")]);
        assert_eq!(request.headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(request.body.as_deref(), Some(&b"grant_type=authorization_code"[..]));
    }
}
