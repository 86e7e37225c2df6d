//! Config save/load roundtrip integration tests.

use clap::Parser;
use herald_core::config::{BackoffStrategy, Config, EmailConfig, RetryOptions};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("herald.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.retry, config.retry);
    assert!(loaded.channels.email.is_none());
    assert!(loaded.channels.sms.is_none());
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("herald.json5");

    let mut config = Config::default();
    config.retry = RetryOptions {
        max_retries: 5,
        backoff: BackoffStrategy::Jittered,
        ..RetryOptions::default()
    };
    config.channels.email = Some(
        Config::parse(r#"{ channels: { email: { host: "relay.internal", port: 2525 } } }"#)
            .unwrap()
            .channels
            .email
            .unwrap(),
    );
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.retry.max_retries, 5);
    assert_eq!(loaded.retry.backoff, BackoffStrategy::Jittered);

    let email: EmailConfig = loaded.channels.email.clone().unwrap();
    assert_eq!(email.host, "relay.internal");
    assert_eq!(email.port, 2525);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/herald.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json5 {");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cli_config_validate_uses_config_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("herald.json5");
    std::fs::write(
        &path,
        r#"{
            // SMS sender must be E.164
            channels: { sms: { account_sid: "AC1", auth_token: "t", from_number: "5550000" } },
        }"#,
    )
    .unwrap();

    let cli = herald_cli::Cli::try_parse_from([
        "herald",
        "--config",
        path.to_str().unwrap(),
        "config",
        "validate",
    ])
    .unwrap();

    let err = herald_cli::run(cli).await.unwrap_err();
    assert!(err.to_string().contains("from_number"));
}
