//! Client Services
//!
//! Composition root for the collaborators shared by every command.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::settings::{AgentConfig, ConfigError};
use crate::application::lifecycle::{Lifecycle, Service, ServiceError};
use crate::application::ports::{Marshaller, PriceHook, PriceProvider};
use crate::application::services::{PriceCache, PriceCacheConfig};
use crate::infrastructure::marshal::JsonMarshaller;
use crate::infrastructure::provider::{MaxAgeHook, NoopPriceHook, StaticPriceProvider};
use crate::infrastructure::ticker::Ticker;

/// Provider, hook and marshaller plus the optional polling cache.
///
/// Starting the bundle starts the cache; waiting on it resolves once the
/// cache has stopped.
pub struct ClientServices {
    /// Price provider.
    pub provider: Arc<dyn PriceProvider>,
    /// Price hook.
    pub hook: Arc<dyn PriceHook>,
    /// Output marshaller.
    pub marshaller: Arc<dyn Marshaller>,
    cache: Option<Arc<PriceCache>>,
    lifecycle: Arc<Lifecycle>,
}

impl ClientServices {
    /// Bundle explicit collaborators without a cache.
    #[must_use]
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        hook: Arc<dyn PriceHook>,
        marshaller: Arc<dyn Marshaller>,
    ) -> Self {
        Self {
            provider,
            hook,
            marshaller,
            cache: None,
            lifecycle: Arc::new(Lifecycle::new("client_services")),
        }
    }

    /// Build the collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the price table cannot be loaded or the
    /// cache cannot be built.
    pub fn from_config(config: &AgentConfig) -> Result<Self, ConfigError> {
        let provider: Arc<dyn PriceProvider> = Arc::new(StaticPriceProvider::from_file(
            &config.provider.prices_file,
        )?);
        let hook: Arc<dyn PriceHook> = if config.provider.max_price_age.is_zero() {
            Arc::new(NoopPriceHook)
        } else {
            Arc::new(MaxAgeHook::new(config.provider.max_price_age))
        };

        let mut services = Self::new(Arc::clone(&provider), hook, Arc::new(JsonMarshaller::new()));
        if config.cache.is_enabled() {
            let cache = PriceCache::new(PriceCacheConfig {
                pairs: config.cache.pairs.iter().map(ToString::to_string).collect(),
                provider: Some(provider),
                ticker: Arc::new(Ticker::new(config.cache.interval)),
            })?;
            services = services.with_cache(cache);
        }
        Ok(services)
    }

    /// Attach a polling cache.
    #[must_use]
    pub fn with_cache(mut self, cache: PriceCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// The polling cache, if configured.
    #[must_use]
    pub fn cache(&self) -> Option<&PriceCache> {
        self.cache.as_deref()
    }
}

impl Service for ClientServices {
    fn start(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        self.lifecycle.begin()?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.start(cancel.clone()) {
                self.lifecycle.finish(Err(e.clone()));
                return Err(e);
            }
        }

        let cache = self.cache.clone();
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            cancel.cancelled().await;
            let result = match cache {
                Some(cache) => cache.wait().await,
                None => Ok(()),
            };
            lifecycle.finish(result);
        });

        Ok(())
    }

    fn wait(&self) -> BoxFuture<'static, Result<(), ServiceError>> {
        self.lifecycle.wait()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::domain::pair::Pair;

    fn price_table() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"prices":[{{"base":"ETH","quote":"USD","price":2500.0,"ts":"2024-01-01T00:00:00Z"}}]}}"#
        )
        .unwrap();
        file
    }

    fn config(file: &tempfile::NamedTempFile, pairs: Vec<Pair>) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.provider.prices_file = file.path().to_path_buf();
        config.cache.pairs = pairs;
        config
    }

    #[test]
    fn missing_price_table_is_an_error() {
        let mut config = AgentConfig::default();
        config.provider.prices_file = "/nonexistent/prices.json".into();

        assert!(matches!(
            ClientServices::from_config(&config),
            Err(ConfigError::PriceTable(_))
        ));
    }

    #[test]
    fn cache_is_optional() {
        let file = price_table();

        let services = ClientServices::from_config(&config(&file, vec![])).unwrap();
        assert!(services.cache().is_none());

        let services =
            ClientServices::from_config(&config(&file, vec![Pair::new("ETH", "USD")])).unwrap();
        assert_eq!(services.cache().unwrap().pairs(), [Pair::new("ETH", "USD")]);
    }

    #[tokio::test]
    async fn wait_resolves_after_cache_stops() {
        let file = price_table();
        let services =
            ClientServices::from_config(&config(&file, vec![Pair::new("ETH", "USD")])).unwrap();
        let cancel = CancellationToken::new();

        services.start(cancel.clone()).unwrap();
        assert_eq!(services.start(cancel.clone()), Err(ServiceError::AlreadyStarted));

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), services.wait())
            .await
            .expect("services should stop after cancellation");
        assert_eq!(result, Ok(()));
    }
}
