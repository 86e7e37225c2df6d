//! # herald-core
//!
//! Core types, configuration, and utilities for Herald.
//!
//! This crate provides shared functionality used across all Herald crates:
//!
//! - **Configuration**: Loading, validation, and persistence of the JSON5 config file
//! - **Types**: The notification channel tag shared by config and dispatch
//! - **Utilities**: Path resolution, phone number checks, and secret handling

pub mod config;
pub mod error;
pub mod paths;
pub mod phone;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use secret::SecretString;
pub use types::NotificationChannel;
