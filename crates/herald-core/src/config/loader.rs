//! Configuration loading and persistence.

use super::{Config, RetryOptions, StatusRanges};
use crate::error::ConfigError;
use crate::paths;
use crate::phone::is_e164;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load from the default path, falling back to defaults when absent.
    pub fn load_or_default() -> Self {
        match Self::load_default() {
            Ok(config) => config,
            Err(e) => {
                debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // JSON is valid JSON5; json5 has no serializer
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        validate_retry("retry", &self.retry, &mut errors);

        if let Some(email) = &self.channels.email {
            if email.host.trim().is_empty() {
                errors.push("Email host must not be empty".to_string());
            }
            if email.port == 0 {
                errors.push("Email port cannot be 0".to_string());
            }
            if email.username.is_some() != email.password.is_some() {
                errors.push("Email username and password must be set together".to_string());
            }
            if let Some(retry) = &email.retry {
                validate_retry("channels.email.retry", retry, &mut errors);
            }
            if let Some(status) = &email.classifier.status {
                validate_status("channels.email.classifier.status", status, &mut errors);
            }
        }

        if let Some(sms) = &self.channels.sms {
            if sms.account_sid.trim().is_empty() {
                errors.push("SMS account_sid must not be empty".to_string());
            }
            if sms.auth_token.is_empty() {
                errors.push("SMS auth_token must not be empty".to_string());
            }
            if !is_e164(&sms.from_number) {
                errors.push(format!(
                    "SMS from_number '{}' is not in E.164 format",
                    sms.from_number
                ));
            }
            if let Some(retry) = &sms.retry {
                validate_retry("channels.sms.retry", retry, &mut errors);
            }
            if let Some(status) = &sms.classifier.status {
                validate_status("channels.sms.classifier.status", status, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

fn validate_retry(section: &str, retry: &RetryOptions, errors: &mut Vec<String>) {
    if retry.max_retries == 0 {
        errors.push(format!("{}: max_retries must be at least 1", section));
    }
    if retry.timeout_ms == 0 {
        errors.push(format!("{}: timeout_ms must be greater than 0", section));
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        errors.push(format!(
            "{}: multiplier must be at least 1.0, got {}",
            section, retry.multiplier
        ));
    }
}

fn validate_status(section: &str, status: &StatusRanges, errors: &mut Vec<String>) {
    for (name, [start, end]) in [("retry", status.retry), ("permanent", status.permanent)] {
        if start >= end {
            errors.push(format!(
                "{}.{}: range start {} must be below end {}",
                section, name, start, end
            ));
        }
    }
}
