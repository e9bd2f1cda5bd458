#![allow(clippy::unwrap_used)]
// Integration tests for `DashinoClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use dashino_api::{ClientConfig, Credentials, DashinoClient, Error, StateUpdate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DashinoClient) {
    let server = MockServer::start().await;
    let client = build(&server, Credentials::new());
    (server, client)
}

fn build(server: &MockServer, credentials: Credentials) -> DashinoClient {
    let config = ClientConfig::new(format!("{}/", server.uri()), "homeassistant")
        .with_credentials(credentials)
        .with_timeout(Duration::from_millis(500));
    DashinoClient::new(reqwest::Client::new(), config).unwrap()
}

fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_owned()))
}

/// The single request the server received.
async fn only_request(server: &MockServer) -> Request {
    let mut requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests.remove(0)
}

// ── Webhooks ────────────────────────────────────────────────────────

#[tokio::test]
async fn forward_webhook_targets_source_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/kitchen"))
        .and(body_json(json!({ "type": "event", "data": [1, 2] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .forward_webhook(Some("kitchen"), &json!({ "type": "event", "data": [1, 2] }))
        .await
        .unwrap();

    let req = only_request(&server).await;
    assert_eq!(
        req.url.as_str(),
        format!("{}/api/webhooks/kitchen", server.uri())
    );
    assert_eq!(client.last_error(), None);
}

#[tokio::test]
async fn forward_webhook_falls_back_to_default_source() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/homeassistant"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    client.forward_webhook(None, &json!({})).await.unwrap();
    client.forward_webhook(Some(""), &json!({})).await.unwrap();
}

#[tokio::test]
async fn empty_default_source_is_rejected_without_io() {
    let server = MockServer::start().await;
    let config = ClientConfig::new(server.uri(), "");
    let client = DashinoClient::new(reqwest::Client::new(), config).unwrap();

    let result = client.forward_webhook(None, &json!({})).await;

    assert!(matches!(
        result,
        Err(Error::EmptyIdentifier { what: "source" })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connectivity_sends_probe_payload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/webhooks/probe"))
        .and(body_json(json!({ "type": "dashino-test", "data": { "ok": true } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.test_connectivity(Some("probe")).await.unwrap();
}

// ── State values ────────────────────────────────────────────────────

#[tokio::test]
async fn set_state_value_returns_json_response() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/states/living_room/value"))
        .and(body_json(json!({ "data": { "temp": 21 }, "merge": true, "source": "ha" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let body = StateUpdate {
        data: json!({ "temp": 21 }),
        merge: true,
        source: "ha".into(),
    };
    let resp = client.set_state_value("living_room", &body).await.unwrap();

    assert_eq!(resp, Some(json!({ "ok": true })));
    let req = only_request(&server).await;
    assert_eq!(
        req.url.as_str(),
        format!("{}/api/states/living_room/value", server.uri())
    );
}

#[tokio::test]
async fn set_state_value_non_json_response_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/states/k/value"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"ok\":true}")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;

    let resp = client.set_state_value("k", &json!({ "raw": 1 })).await.unwrap();
    assert_eq!(resp, None);
}

#[tokio::test]
async fn set_state_value_rejects_empty_key() {
    let (_server, client) = setup().await;
    let result = client.set_state_value("", &json!({})).await;
    assert!(matches!(result, Err(Error::EmptyIdentifier { .. })));
}

#[tokio::test]
async fn clear_state_value_issues_delete_without_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/states/k/value"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.clear_state_value("k").await.unwrap();

    let req = only_request(&server).await;
    assert!(req.body.is_empty());
}

#[tokio::test]
async fn clear_state_value_surfaces_404() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let err = client.clear_state_value("gone").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(client.last_error().as_deref(), Some("Status 404: missing"));
}

// ── Health / probes ─────────────────────────────────────────────────

#[tokio::test]
async fn check_health_success_and_missing_endpoint() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client.check_health().await.unwrap();
    let err = client.check_health().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn check_state_api_tolerates_404_on_delete() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/states/probe/value"))
        .and(body_json(
            json!({ "data": { "ok": true }, "merge": false, "source": "homeassistant" }),
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/states/probe/value"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    client.check_state_api(Some("probe"), None).await.unwrap();
}

#[tokio::test]
async fn check_state_api_propagates_other_delete_failures() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .mount(&server)
        .await;

    let err = client.check_state_api(Some("probe"), None).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn check_state_api_propagates_write_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.check_state_api(None, Some("setup")).await.unwrap_err();
    assert!(err.is_not_found());

    // The write failed, so the delete was never attempted.
    let req = only_request(&server).await;
    assert!(req.url.path().starts_with("/api/states/dashino-probe-"));
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_sets_status_and_last_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.set_state_value("k", &json!({})).await.unwrap_err();

    match err {
        Error::Request { status, ref message } => {
            assert_eq!(status, 500);
            assert!(message.contains("boom"), "got: {message}");
        }
        other => panic!("expected Request error, got: {other:?}"),
    }
    assert_eq!(client.last_error().as_deref(), Some("Status 500: boom"));
}

#[tokio::test]
async fn error_body_is_truncated_to_200_chars() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("é".repeat(500)))
        .mount(&server)
        .await;

    let err = client.forward_webhook(None, &json!({})).await.unwrap_err();

    let expected = format!("Status 502: {}", "é".repeat(200));
    assert_eq!(client.last_error(), Some(expected.clone()));
    assert!(matches!(err, Error::Request { message, .. } if message == expected));
}

#[tokio::test]
async fn success_clears_last_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client.forward_webhook(None, &json!({})).await.is_err());
    assert_eq!(client.last_error().as_deref(), Some("Status 503: busy"));

    client.forward_webhook(None, &json!({})).await.unwrap();
    assert_eq!(client.last_error(), None);
}

#[tokio::test]
async fn timeout_is_distinct_from_request_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = client.forward_webhook(None, &json!({})).await.unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }), "got: {err:?}");
    assert_eq!(err.status(), None);
    assert!(err.is_transport());
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn connection_failure_is_transport_error() {
    // Grab a free port and close it again so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let uri = format!("http://127.0.0.1:{port}");
    let client =
        DashinoClient::new(reqwest::Client::new(), ClientConfig::new(uri, "ha")).unwrap();
    let err = client.check_health().await.unwrap_err();

    assert!(err.is_transport(), "got: {err:?}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn malformed_json_success_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let err = client.set_state_value("k", &json!({})).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
    assert_eq!(err.status(), None);
}

// ── Headers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn token_and_secret_headers_sent_together() {
    let server = MockServer::start().await;
    let client = build(
        &server,
        Credentials::new()
            .with_api_token(secret("tok-123"))
            .with_secret(secret("shh"))
            .with_secret_header("X-Webhook-Secret"),
    );

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("x-webhook-secret", "shh"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.forward_webhook(None, &json!({})).await.unwrap();
}

#[tokio::test]
async fn anonymous_client_sends_no_auth_headers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    client.check_health().await.unwrap();

    let req = only_request(&server).await;
    assert!(req.headers.get("authorization").is_none());
    assert!(req.headers.get("x-dashino-secret").is_none());
    assert_eq!(client.headers().len(), 1);
}
