#![allow(clippy::unwrap_used)]
// End-to-end service and verification tests against a wiremock dashboard.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashino_api::{ClientConfig, DashinoClient};
use dashino_config::Settings;
use dashino_core::{
    ClearStateRequest, CoreError, Dashino, EntityState, ForwardRequest, Probe, ServiceDefaults,
    SetStateFieldRequest, SetStateRequest, VerifyError, setup_entry, verify_connection,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn client(server: &MockServer) -> DashinoClient {
    let config = ClientConfig::new(server.uri(), "homeassistant")
        .with_timeout(Duration::from_millis(500));
    DashinoClient::new(reqwest::Client::new(), config).unwrap()
}

fn session(server: &MockServer, defaults: ServiceDefaults) -> Dashino {
    Dashino::new(Arc::new(client(server)), defaults)
}

fn defaults() -> ServiceDefaults {
    ServiceDefaults {
        source: "homeassistant".into(),
        state_key: Some("living-room".into()),
        widget_id: Some("clock".into()),
        message_type: None,
    }
}

// ── Services ────────────────────────────────────────────────────────

#[tokio::test]
async fn forward_posts_message_to_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/garage"))
        .and(body_json(json!({ "widgetId": "clock", "data": { "open": true } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dash = session(&server, defaults());
    dash.forward(&ForwardRequest {
        source: Some("garage".into()),
        data: Some(json!({ "open": true })),
        ..ForwardRequest::default()
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn forward_without_any_source_is_rejected_before_io() {
    let server = MockServer::start().await;
    let dash = session(
        &server,
        ServiceDefaults {
            source: String::new(),
            ..ServiceDefaults::default()
        },
    );

    let err = dash.forward(&ForwardRequest::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "Dashino source is required");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn set_state_uses_default_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/states/living-room/value"))
        .and(body_json(
            json!({ "data": { "lamp": "on" }, "merge": false, "source": "homeassistant" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stored": true })))
        .expect(1)
        .mount(&server)
        .await;

    let dash = session(&server, defaults());
    let echoed = dash
        .set_state(&SetStateRequest {
            data: Some(json!({ "lamp": "on" })),
            replace: Some(true),
            ..SetStateRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(echoed, Some(json!({ "stored": true })));
}

#[tokio::test]
async fn request_failures_surface_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dash = session(&server, defaults());
    let err = dash
        .set_state(&SetStateRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Status 500: boom");
    assert_eq!(
        dash.client().last_error().as_deref(),
        Some("Status 500: boom")
    );
}

#[tokio::test]
async fn timeouts_are_reported_per_operation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let dash = session(&server, defaults());
    let err = dash
        .clear_state(&ClearStateRequest::default())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "Dashino clear_state timed out");
}

#[tokio::test]
async fn set_state_field_sends_extracted_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/states/alarm/value"))
        .and(body_json(
            json!({ "data": { "armed": 1.0 }, "merge": true, "source": "security" }),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut states = HashMap::new();
    states.insert(
        "alarm_control_panel.home".to_owned(),
        EntityState {
            entity_id: "alarm_control_panel.home".into(),
            state: "armed_away".into(),
            attributes: Map::new(),
        },
    );
    let table: Map<String, serde_json::Value> =
        serde_json::from_value(json!({ "armed_away": 1, "disarmed": 0 })).unwrap();

    let dash = session(&server, defaults());
    let echoed = dash
        .set_state_field(
            &SetStateFieldRequest {
                key: Some("alarm".into()),
                field: "armed".into(),
                entity_id: "alarm_control_panel.home".into(),
                map: Some(table),
                as_number: true,
                source: Some("security".into()),
                ..SetStateFieldRequest::default()
            },
            &states,
        )
        .await
        .unwrap();
    assert_eq!(echoed, None);
}

#[tokio::test]
async fn set_state_field_unknown_entity_sends_nothing() {
    let server = MockServer::start().await;
    let states: HashMap<String, EntityState> = HashMap::new();

    let dash = session(&server, defaults());
    let err = dash
        .set_state_field(
            &SetStateFieldRequest {
                field: "temp".into(),
                entity_id: "sensor.gone".into(),
                ..SetStateFieldRequest::default()
            },
            &states,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::EntityNotFound { .. }));
    assert_eq!(err.to_string(), "Entity 'sensor.gone' not found");
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Verification ────────────────────────────────────────────────────

#[tokio::test]
async fn verify_prefers_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let probe = verify_connection(&client(&server), None).await.unwrap();
    assert_eq!(probe, Probe::Health);
}

#[tokio::test]
async fn verify_falls_back_to_state_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path_regex(r"^/api/states/dashino-probe-[0-9a-f]+/value$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let probe = verify_connection(&client(&server), None).await.unwrap();
    assert_eq!(probe, Probe::StateApi);
}

#[tokio::test]
async fn verify_reports_missing_state_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = verify_connection(&client(&server), None).await.unwrap_err();
    assert_eq!(err, VerifyError::StateApiMissing);
    assert_eq!(err.code(), "state_api_missing");
}

#[tokio::test]
async fn verify_other_failures_cannot_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = verify_connection(&client(&server), None).await.unwrap_err();
    assert_eq!(err, VerifyError::CannotConnect);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = verify_connection(&client(&server), None).await.unwrap_err();
    assert_eq!(err, VerifyError::CannotConnect);
}

#[tokio::test]
async fn setup_entry_normalizes_and_verifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let input = Settings {
        base_url: Some(format!("  {}/ ", server.uri())),
        default_source: Some("  ".into()),
        ..Settings::default()
    };
    let resolved = setup_entry(&input, reqwest::Client::new()).await.unwrap();

    assert_eq!(resolved.base_url, server.uri());
    assert_eq!(resolved.default_source, "homeassistant");
}

#[tokio::test]
async fn setup_entry_field_errors() {
    let input = Settings {
        base_url: Some("ftp://files.local".into()),
        ..Settings::default()
    };
    let errors = setup_entry(&input, reqwest::Client::new())
        .await
        .unwrap_err();
    assert_eq!(errors.get("base_url"), Some("invalid_url"));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let input = Settings {
        base_url: Some(server.uri()),
        ..Settings::default()
    };
    let errors = setup_entry(&input, reqwest::Client::new())
        .await
        .unwrap_err();
    assert_eq!(errors.get("base"), Some("cannot_connect"));
}

#[tokio::test]
async fn setup_entry_blames_bad_token_not_url() {
    let server = MockServer::start().await;
    let input = Settings {
        base_url: Some(server.uri()),
        api_token: Some("a\u{1}b".into()),
        ..Settings::default()
    };
    let errors = setup_entry(&input, reqwest::Client::new())
        .await
        .unwrap_err();

    assert_eq!(errors.get("api_token"), Some("invalid_token"));
    assert_eq!(errors.get("base_url"), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}
