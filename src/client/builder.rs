use crate::cache::{ExplanationStore, SqliteStore};
use crate::client::core::Broker;
use crate::client::upstream::HttpUpstream;
use crate::config::{BrokerConfig, StoreConfig, UpstreamConfig};
use crate::drivers::UpstreamClient;
use crate::error::{Error, ErrorContext};
use crate::Result;
use std::sync::Arc;

/// Builder for [`Broker`].
///
/// Store and upstream are injected; nothing is reached through globals.
/// [`BrokerBuilder::from_env`] fills in whatever was not injected with the
/// SQLite store and HTTP upstream described by the environment.
pub struct BrokerBuilder {
    store: Option<Arc<dyn ExplanationStore>>,
    upstream: Option<Arc<dyn UpstreamClient>>,
    config: Option<BrokerConfig>,
}

impl BrokerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            upstream: None,
            config: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn ExplanationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn UpstreamClient>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Complete the builder from environment configuration.
    pub fn from_env(mut self) -> Result<Self> {
        let store_cfg = StoreConfig::from_env();
        let upstream_cfg = UpstreamConfig::from_env();
        if self.store.is_none() {
            let store = SqliteStore::open(&store_cfg.database_path, store_cfg.timeout)?;
            self.store = Some(Arc::new(store));
        }
        if self.upstream.is_none() {
            self.upstream = Some(Arc::new(HttpUpstream::new(&upstream_cfg)?));
        }
        if self.config.is_none() {
            self.config = Some(BrokerConfig::from_parts(&store_cfg, &upstream_cfg));
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Broker> {
        let store = self.store.ok_or_else(|| {
            Error::configuration_with_context(
                "broker requires a store",
                ErrorContext::new().with_source("broker_builder"),
            )
        })?;
        let upstream = self.upstream.ok_or_else(|| {
            Error::configuration_with_context(
                "broker requires an upstream client",
                ErrorContext::new().with_source("broker_builder"),
            )
        })?;
        Ok(Broker::new(store, upstream, self.config.unwrap_or_default()))
    }
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
