//! End-to-end dispatch through the registry with real adapters over fake
//! transports.

use herald_channels::error::ProviderError;
use herald_channels::{
    DispatchRequest, Dispatcher, EmailPayload, NotifierRegistry, SmsPayload,
};
use herald_core::NotificationChannel;
use herald_integration_tests::{fast_retry_config, FakeFactory, SMS_SENDER};
use serde_json::json;
use std::sync::Arc;

async fn dispatcher() -> (Dispatcher, FakeFactory) {
    let factory = FakeFactory::default();
    let registry = Arc::new(NotifierRegistry::with_factory(Arc::new(factory.clone())));
    registry.initialize(fast_retry_config()).await;
    (Dispatcher::new(registry), factory)
}

fn welcome_email() -> EmailPayload {
    EmailPayload::new("noreply@herald.test", "user@herald.test", "Welcome")
        .with_html("<h1>Welcome aboard</h1>")
        .with_text("Welcome aboard")
}

#[tokio::test]
async fn test_email_delivered_with_message_id() {
    let (dispatcher, factory) = dispatcher().await;

    let outcome = dispatcher.send_email(welcome_email()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.message_id(), Some("<1@relay.test>"));
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(factory.mail.sent()[0].html.as_deref(), Some("<h1>Welcome aboard</h1>"));
}

#[tokio::test]
async fn test_email_verified_once_across_sends() {
    let (dispatcher, factory) = dispatcher().await;

    dispatcher.send_email(welcome_email()).await;
    dispatcher.send_email(welcome_email()).await;

    assert_eq!(factory.mail.verifications(), 1);
    assert_eq!(factory.mail.sent().len(), 2);
}

#[tokio::test]
async fn test_email_retries_transient_smtp_reply() {
    let (dispatcher, factory) = dispatcher().await;
    factory.mail.fail_next([
        ProviderError::new("Greylisted, try later").with_status(451),
        ProviderError::new("connection reset").with_code("ECONNRESET"),
    ]);

    let outcome = dispatcher.send_email(welcome_email()).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 3);
}

#[tokio::test]
async fn test_email_permanent_smtp_reply_not_retried() {
    let (dispatcher, factory) = dispatcher().await;
    factory
        .mail
        .fail_next([ProviderError::new("Mailbox does not exist").with_status(550)]);

    let outcome = dispatcher.send_email(welcome_email()).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(outcome.error(), Some("Mailbox does not exist"));
    assert!(factory.mail.sent().is_empty());
}

#[tokio::test]
async fn test_email_pass_through_options_reach_transport() {
    let (dispatcher, factory) = dispatcher().await;

    let payload = welcome_email().with_option("auth", json!({ "user": "ops", "pass": "s3cret" }));
    dispatcher.send_email(payload).await;

    let sent = factory.mail.sent();
    assert_eq!(sent[0].options["auth"]["pass"], "s3cret");
}

#[tokio::test]
async fn test_sms_to_every_recipient() {
    let (dispatcher, factory) = dispatcher().await;

    let outcome = dispatcher
        .send_sms(SmsPayload::new(vec!["+15551110000", "+15552220000"], "Deploy done"))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);

    let mut recipients: Vec<String> = factory.sms.sent().into_iter().map(|m| m.to).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["+15551110000", "+15552220000"]);
    assert!(factory.sms.sent().iter().all(|m| m.from == SMS_SENDER));
}

#[tokio::test]
async fn test_sms_rate_limit_retried() {
    let (dispatcher, factory) = dispatcher().await;
    factory
        .sms
        .fail_next([ProviderError::new("Too Many Requests").with_code(20429).with_status(429)]);

    let outcome = dispatcher.send_sms(SmsPayload::new("+15551234567", "hi")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.message_id(), Some("SM1"));
}

#[tokio::test]
async fn test_invalid_sms_never_reaches_gateway() {
    let (dispatcher, factory) = dispatcher().await;

    let outcome = dispatcher.send_sms(SmsPayload::new("555-1234", "hi")).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts(), 0);
    assert!(outcome.error().unwrap().contains("E.164"));
    assert!(factory.sms.sent().is_empty());
}

#[tokio::test]
async fn test_fan_out_independent_outcomes() {
    let (dispatcher, _factory) = dispatcher().await;

    let outcomes = dispatcher
        .send_fan_out(&[
            DispatchRequest::for_payload(welcome_email()),
            DispatchRequest::for_payload(SmsPayload::new("not-a-number", "hi")),
            DispatchRequest::new(
                NotificationChannel::Push,
                SmsPayload::new("+15551234567", "hi"),
            ),
        ])
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert_eq!(outcomes[2].error(), Some("push notifications not yet implemented"));
}

#[tokio::test]
async fn test_fallback_to_sms_when_email_rejected() {
    let (dispatcher, factory) = dispatcher().await;
    factory
        .mail
        .fail_next([ProviderError::new("Invalid credentials").with_status(535)]);

    let outcome = dispatcher
        .send_with_fallback(
            &DispatchRequest::for_payload(welcome_email()),
            &DispatchRequest::for_payload(SmsPayload::new("+15551234567", "Welcome aboard")),
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.provider(), Some("sms"));
    assert_eq!(factory.sms.sent().len(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_email_transport() {
    let (dispatcher, factory) = dispatcher().await;
    dispatcher.send_email(welcome_email()).await;

    assert_eq!(
        dispatcher.registry().available_channels().await,
        vec![NotificationChannel::Email]
    );
    dispatcher.registry().shutdown().await;

    assert!(factory.mail.is_closed());
    assert!(dispatcher.registry().available_channels().await.is_empty());
}
