//! Dispatch service: the facade transport handlers call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{info, warn};

use crate::client::{self, HttpTransport, Provider, ProviderError, ReqwestTransport};
use crate::config::{ConfigError, GatewayConfig};
use crate::domain::{
    CallbackQuery, CallbackReply, Credit, OutboundMessage, ProviderId, ProviderProfile,
    SendResult,
};
use crate::registry::{ProviderRegistry, RegistryError};
use crate::sink::{DeliverySink, TracingSink};

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Offset of the wall-clock timestamps in vendor delivery reports when none is configured.
pub const DEFAULT_VENDOR_UTC_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("provider not found: {id}")]
    NotFound { id: String },

    /// Broadcast send where every provider failed; each provider's error is kept.
    #[error("send failed on all {} providers", .failures.len())]
    AllFailed {
        failures: Vec<(ProviderId, ProviderError)>,
    },

    #[error("provider {id}: {source}")]
    Provider {
        id: ProviderId,
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("HTTP client error: {0}")]
    Http(#[source] reqwest::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Outcome of a broadcast send that reached at least one provider.
#[derive(Debug)]
pub struct Broadcast {
    pub delivered: Vec<(ProviderId, SendResult)>,
    pub failed: Vec<(ProviderId, ProviderError)>,
}

#[derive(Clone)]
/// Builder for [`Dispatcher`].
///
/// Use this to set the HTTP timeout, user agent, vendor timestamp zone or delivery sink.
pub struct DispatcherBuilder {
    profiles: Vec<ProviderProfile>,
    timeout: Duration,
    user_agent: Option<String>,
    vendor_zone: FixedOffset,
    sink: Arc<dyn DeliverySink>,
}

impl DispatcherBuilder {
    /// Create a builder for the given profiles, in the order broadcasts should visit them.
    pub fn new(profiles: Vec<ProviderProfile>) -> Self {
        Self {
            profiles,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            vendor_zone: FixedOffset::east_opt(DEFAULT_VENDOR_UTC_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Create a builder from loaded configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::new(config.profiles()?)
            .timeout(config.timeout())
            .vendor_timezone(config.vendor_timezone()?);
        if let Some(user_agent) = config.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        Ok(builder)
    }

    /// Timeout applied to every vendor request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Zone the vendors' `YYYYMMDDhhmmss` callback timestamps are interpreted in.
    pub fn vendor_timezone(mut self, zone: FixedOffset) -> Self {
        self.vendor_zone = zone;
        self
    }

    pub fn sink(mut self, sink: impl DeliverySink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Build a [`Dispatcher`] backed by a shared HTTP client.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if self.timeout.is_zero() {
            return Err(BuildError::ZeroTimeout);
        }
        let http = ReqwestTransport::new(self.timeout, self.user_agent.as_deref())
            .map_err(BuildError::Http)?;
        self.build_with(Arc::new(http))
    }

    fn build_with(self, http: Arc<dyn HttpTransport>) -> Result<Dispatcher, BuildError> {
        let providers = self
            .profiles
            .into_iter()
            .map(|profile| {
                let provider = client::connect(&profile, http.clone(), self.vendor_zone);
                (profile, provider)
            })
            .collect();
        let registry = ProviderRegistry::new(providers)?;
        Ok(Dispatcher::new(Arc::new(registry), self.sink))
    }
}

#[derive(Clone)]
/// Broadcast send, credit lookup and webhook routing over a [`ProviderRegistry`].
///
/// Cheap to clone; clones share the registry and sink.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    sink: Arc<dyn DeliverySink>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, sink: Arc<dyn DeliverySink>) -> Self {
        Self { registry, sink }
    }

    pub fn builder(profiles: Vec<ProviderProfile>) -> DispatcherBuilder {
        DispatcherBuilder::new(profiles)
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Send `message` through every registered provider, in registration order.
    ///
    /// Role is ignored: masters and backups are all tried. A provider failure is logged and
    /// the remaining providers are still tried. Succeeds if any provider accepted the message.
    ///
    /// Errors:
    /// - [`DispatchError::AllFailed`] when no provider accepted it.
    pub async fn send(&self, message: &OutboundMessage) -> Result<Broadcast, DispatchError> {
        let mut delivered = Vec::new();
        let mut failed = Vec::new();

        for (id, provider) in self.registry.providers() {
            match provider.send(message).await {
                Ok(result) => delivered.push((id.clone(), result)),
                Err(err) => {
                    warn!(
                        provider = %id,
                        recipient = message.recipient().raw(),
                        error = %err,
                        "send failed"
                    );
                    failed.push((id.clone(), err));
                }
            }
        }

        if delivered.is_empty() {
            return Err(DispatchError::AllFailed { failures: failed });
        }
        Ok(Broadcast { delivered, failed })
    }

    /// Send through one provider only.
    pub async fn send_via(
        &self,
        id: &str,
        message: &OutboundMessage,
    ) -> Result<SendResult, DispatchError> {
        let (id, provider) = self.lookup(id)?;
        provider
            .send(message)
            .await
            .map_err(|source| DispatchError::Provider { id, source })
    }

    /// Send through the current master only.
    pub async fn send_via_master(
        &self,
        message: &OutboundMessage,
    ) -> Result<SendResult, DispatchError> {
        let id = self.registry.master_id();
        self.send_via(id.as_str(), message).await
    }

    pub async fn credit(&self, id: &str) -> Result<Credit, DispatchError> {
        let (id, provider) = self.lookup(id)?;
        provider
            .credit()
            .await
            .map_err(|source| DispatchError::Provider { id, source })
    }

    /// Credit of the current master.
    pub async fn master_credit(&self) -> Result<Credit, DispatchError> {
        let id = self.registry.master_id();
        self.credit(id.as_str()).await
    }

    /// Route a delivery-status webhook to the provider that owns `id`.
    ///
    /// On success the event has already been handed to the sink; `ack` is the body to answer
    /// the vendor with.
    pub fn callback(
        &self,
        id: &str,
        query: &CallbackQuery,
    ) -> Result<CallbackReply, DispatchError> {
        let (id, provider) = self.lookup(id)?;
        let reply = match provider.callback(query) {
            Ok(reply) => reply,
            Err(source) => {
                warn!(provider = %id, error = %source, "delivery report rejected");
                return Err(DispatchError::Provider { id, source });
            }
        };

        info!(
            provider = %id,
            msgid = reply.event.message_id(),
            status = reply.event.status_code(),
            "delivery report received"
        );
        self.sink.record(&id, reply.event.clone());
        Ok(reply)
    }

    pub fn switch_master_to(&self, id: &str) -> Result<(), DispatchError> {
        self.registry
            .switch_master_to(id)
            .map_err(|_| DispatchError::NotFound { id: id.to_owned() })
    }

    /// Query every provider's credit once, in registration order.
    ///
    /// Failures are logged and returned, never fatal.
    pub async fn probe_credits(&self) -> Vec<(ProviderId, Result<Credit, ProviderError>)> {
        let mut results = Vec::with_capacity(self.registry.len());
        for (id, provider) in self.registry.providers() {
            let result = provider.credit().await;
            if let Err(err) = &result {
                warn!(provider = %id, error = %err, "credit probe failed");
            }
            results.push((id.clone(), result));
        }
        results
    }

    fn lookup(&self, id: &str) -> Result<(ProviderId, Arc<dyn Provider>), DispatchError> {
        let not_found = || DispatchError::NotFound { id: id.to_owned() };
        let provider_id = ProviderId::new(id).map_err(|_| not_found())?;
        let provider = self
            .registry
            .lookup(provider_id.as_str())
            .map_err(|_| not_found())?;
        Ok((provider_id, provider))
    }
}
