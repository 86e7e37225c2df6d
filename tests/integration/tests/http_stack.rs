//! Full stack against mock HTTP services: registry, HTTP adapter factory,
//! and the mail relay and SMS gateway transports.

use herald_channels::{Dispatcher, EmailPayload, NotifierRegistry, SmsPayload};
use herald_core::Config;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let address = server.address();
    Config::parse(&format!(
        r#"{{
            retry: {{ max_retries: 3, delay_ms: 10, timeout_ms: 5000 }},
            channels: {{
                email: {{ host: "{host}", port: {port}, secure: false, username: "u", password: "p" }},
                sms: {{
                    account_sid: "AC1",
                    auth_token: "token",
                    from_number: "+15550000000",
                    api_base: "{uri}",
                }},
            }},
        }}"#,
        host = address.ip(),
        port = address.port(),
        uri = server.uri(),
    ))
    .unwrap()
}

async fn dispatcher(server: &MockServer) -> Dispatcher {
    let registry = Arc::new(NotifierRegistry::new());
    registry.initialize(config_for(server)).await;
    Dispatcher::new(registry)
}

#[tokio::test]
async fn test_email_through_relay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageId": "<42@relay>",
            "accepted": ["a@x.io"],
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let payload = EmailPayload::new("noreply@x.io", "a@x.io", "Hi").with_text("hello");

    let first = dispatcher.send_email(payload.clone()).await;
    let second = dispatcher.send_email(payload).await;

    assert!(first.is_success());
    assert_eq!(first.message_id(), Some("<42@relay>"));
    assert!(second.is_success());
}

#[tokio::test]
async fn test_relay_unreachable_is_connection_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/verify"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let outcome = dispatcher
        .send_email(EmailPayload::new("noreply@x.io", "a@x.io", "Hi").with_text("hello"))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts(), 1);
    assert!(outcome
        .error()
        .unwrap()
        .contains("Failed to connect to email service"));
}

#[tokio::test]
async fn test_sms_retries_twilio_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Accounts/AC1/Messages.json"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "code": 20429,
            "message": "Too Many Requests",
            "status": 429,
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Accounts/AC1/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM99",
            "status": "queued",
        })))
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let outcome = dispatcher.send_sms(SmsPayload::new("+15551234567", "hi")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(outcome.message_id(), Some("SM99"));
}

#[tokio::test]
async fn test_sms_invalid_number_from_gateway_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Accounts/AC1/Messages.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number +15005550001 is not a valid phone number.",
            "status": 400,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let outcome = dispatcher.send_sms(SmsPayload::new("+15005550001", "hi")).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts(), 1);
}
