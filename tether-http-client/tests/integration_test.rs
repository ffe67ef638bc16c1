//! Integration tests for tether-http-client

use std::time::Duration;
use tether_http_client::*;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_retry(max_attempts: u32) -> HttpClient {
    HttpClient::new(
        HttpClientConfig::builder()
            .retry(RetryConfig::fixed(max_attempts, Duration::from_millis(5)))
            .build(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_get_with_query_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"login": "octocat"})))
        .mount(&server)
        .await;

    let client = HttpClient::default_client().unwrap();
    let response = client
        .get(format!("{}/user", server.uri()))
        .query("page", "2")
        .bearer_auth("abc")
        .send()
        .await
        .unwrap();

    assert!(response.is_success());
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["login"], "octocat");
}

#[tokio::test]
async fn test_form_body_is_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("grant_type=refresh_token&refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::default_client().unwrap();
    let response = client
        .post(format!("{}/token", server.uri()))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", "r1")])
        .send()
        .await
        .unwrap();

    assert!(response.is_success());
}

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/flaky"))
        .and(body_string("x=1"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = client_with_retry(3);
    let response = client
        .post(format!("{}/flaky", server.uri()))
        .form(&[("x", "1")])
        .send()
        .await
        .unwrap();

    // The third attempt only matches if the replayed request kept its body
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_with_retry(2);
    let response = client
        .get(format!("{}/down", server.uri()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err = response.error_for_status().unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_retry(3);
    let response = client
        .get(format!("{}/missing", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_url() {
    let client = HttpClient::default_client().unwrap();
    let err = client.get("not a url").send().await.unwrap_err();
    assert!(matches!(err, HttpClientError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_default_headers_yield_to_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("x-tenant", "acme"))
        .and(header("accept", "application/json"))
        .and(header("user-agent", "acme-sync/2.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .mount(&server)
        .await;

    let client = HttpClient::new(
        HttpClientConfig::builder()
            .user_agent("acme-sync/2.1")
            .default_header("x-tenant", "acme")
            .default_header("accept", "text/html")
            .build(),
    )
    .unwrap();

    let response = client
        .get(format!("{}/me", server.uri()))
        .accept_json()
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    assert_eq!(response.json::<serde_json::Value>().unwrap()["id"], 7);
}

#[tokio::test]
async fn test_bad_header_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpClient::default_client().unwrap();
    let err = client
        .get(server.uri())
        .header("x-broken", "a\r\nb")
        .send()
        .await
        .unwrap_err();
    assert!(matches!(err, HttpClientError::InvalidHeader(_)));
}
