//! Notifier registry: lazily builds and caches one notifier per channel.

use crate::classifier::ClassifierRules;
use crate::email::EmailAdapter;
use crate::error::NotifyError;
use crate::notifier::Notifier;
use crate::retry::RetryPolicy;
use crate::sms::SmsAdapter;
use crate::traits::{AdapterFactory, ProviderAdapter};
use crate::transport::{HttpMailTransport, HttpSmsGateway};
use crate::Result;
use async_trait::async_trait;
use herald_core::{Config, NotificationChannel};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Builds the HTTP-backed email and SMS adapters from configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpAdapterFactory;

#[async_trait]
impl AdapterFactory for HttpAdapterFactory {
    async fn create(
        &self,
        channel: NotificationChannel,
        config: &Config,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        match channel {
            NotificationChannel::Email => {
                let email = config
                    .channels
                    .email
                    .as_ref()
                    .ok_or(NotifyError::MissingConfiguration(channel))?;

                let transport = HttpMailTransport::from_config(email)?;
                let adapter = EmailAdapter::new(Arc::new(transport))
                    .with_name(email.service.as_deref().unwrap_or("email"))
                    .with_rules(ClassifierRules::email().with_overrides(&email.classifier));
                Ok(Arc::new(adapter))
            }
            NotificationChannel::Sms => {
                let sms = config
                    .channels
                    .sms
                    .as_ref()
                    .ok_or(NotifyError::MissingConfiguration(channel))?;

                let gateway = HttpSmsGateway::from_config(sms)?;
                let adapter = SmsAdapter::new(Arc::new(gateway), sms.from_number.clone())
                    .with_rules(ClassifierRules::sms().with_overrides(&sms.classifier));
                Ok(Arc::new(adapter))
            }
            NotificationChannel::Push | NotificationChannel::Chat => {
                Err(NotifyError::UnsupportedChannel(channel))
            }
        }
    }
}

#[derive(Default)]
struct RegistryState {
    config: Option<Arc<Config>>,
    notifiers: HashMap<NotificationChannel, Arc<Notifier>>,
}

/// Registry of notifiers, one per channel.
///
/// The lock is held across check-then-create and across teardown, so a
/// channel's adapter is built at most once per cache lifetime.
pub struct NotifierRegistry {
    state: Mutex<RegistryState>,
    factory: Arc<dyn AdapterFactory>,
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierRegistry {
    /// Registry backed by [`HttpAdapterFactory`].
    pub fn new() -> Self {
        Self::with_factory(Arc::new(HttpAdapterFactory))
    }

    pub fn with_factory(factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            factory,
        }
    }

    /// Supply configuration. Re-initializing replaces the configuration but
    /// keeps notifiers already built.
    pub async fn initialize(&self, config: Config) {
        let mut state = self.state.lock().await;
        state.config = Some(Arc::new(config));
        info!("Notifier registry initialized");
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.config.is_some()
    }

    /// Get the notifier for a channel, building it on first use.
    pub async fn resolve(&self, channel: NotificationChannel) -> Result<Arc<Notifier>> {
        let mut state = self.state.lock().await;

        let config = state.config.clone().ok_or(NotifyError::NotInitialized)?;

        if let Some(notifier) = state.notifiers.get(&channel) {
            debug!("Using cached {} notifier", channel);
            return Ok(notifier.clone());
        }

        let policy = RetryPolicy::try_from(config.retry_for(channel))?;
        let adapter = self.factory.create(channel, &config).await?;
        let notifier = Arc::new(Notifier::new(adapter, policy));

        info!(
            "Created {} notifier (provider: {})",
            channel,
            notifier.provider_name()
        );
        state.notifiers.insert(channel, notifier.clone());
        Ok(notifier)
    }

    /// Install a notifier for a channel, replacing any cached one.
    pub async fn register_override(&self, channel: NotificationChannel, notifier: Arc<Notifier>) {
        let mut state = self.state.lock().await;
        info!(
            "Registered custom {} notifier (provider: {})",
            channel,
            notifier.provider_name()
        );
        state.notifiers.insert(channel, notifier);
    }

    /// Channels with a cached notifier.
    pub async fn available_channels(&self) -> Vec<NotificationChannel> {
        let state = self.state.lock().await;
        NotificationChannel::ALL
            .iter()
            .copied()
            .filter(|channel| state.notifiers.contains_key(channel))
            .collect()
    }

    /// Drop every cached notifier without closing it.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.notifiers.clear();
        info!("Notifier registry cleared");
    }

    /// Close every cached notifier, then clear the cache.
    ///
    /// Close failures are logged; shutdown always completes.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;

        for (channel, notifier) in state.notifiers.drain() {
            if let Err(e) = notifier.close().await {
                warn!("Error closing {} notifier: {}", channel, e);
            }
        }
        info!("Notifier registry shut down");
    }
}
