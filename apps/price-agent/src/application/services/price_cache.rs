//! Price Cache
//!
//! Background service that periodically fetches prices for a fixed set of
//! pairs, keeps the latest good tick per pair, and republishes each update
//! to subscribers.
//!
//! # Tasks
//!
//! - **Broadcaster**: on every tick, refreshes each pair in configured order.
//!   A failing pair is logged and skipped; the next tick is its retry.
//! - **Shutdown watcher**: waits for cancellation, then reports completion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::application::lifecycle::{Lifecycle, Service, ServiceError};
use crate::application::ports::{PriceProvider, ProviderError};
use crate::domain::pair::{Pair, PairError, parse_pairs};
use crate::domain::price::PriceTick;
use crate::infrastructure::metrics;
use crate::infrastructure::ticker::Ticker;

/// Tag attached to every log line of the cache.
pub const LOGGER_TAG: &str = "PRICE_CACHE";

/// Buffered updates per subscriber.
const UPDATE_CAPACITY: usize = 256;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the [`PriceCache`].
pub struct PriceCacheConfig {
    /// Pairs to refresh, in `BASE/QUOTE` form.
    pub pairs: Vec<String>,
    /// Provider used to fetch prices.
    pub provider: Option<Arc<dyn PriceProvider>>,
    /// Refresh schedule.
    pub ticker: Arc<Ticker>,
}

/// Price cache construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// No provider configured.
    #[error("price provider must not be nil")]
    NilProvider,

    /// A configured pair is malformed.
    #[error("invalid pair: {0}")]
    InvalidPair(#[from] PairError),

    /// No pairs configured.
    #[error("at least one pair must be configured")]
    NoPairs,
}

/// Why a single pair was not updated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Provider returned a tick marked unusable.
    #[error("{0}")]
    Tick(String),
}

// =============================================================================
// Price Cache
// =============================================================================

/// Periodically refreshed price snapshot.
pub struct PriceCache {
    refresher: Arc<Refresher>,
    ticker: Arc<Ticker>,
    lifecycle: Arc<Lifecycle>,
}

struct Refresher {
    pairs: Vec<Pair>,
    provider: Arc<dyn PriceProvider>,
    snapshot: RwLock<HashMap<Pair, PriceTick>>,
    updates: broadcast::Sender<PriceTick>,
}

impl PriceCache {
    /// Create a new cache.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the provider is missing or the pairs are
    /// empty or malformed.
    pub fn new(config: PriceCacheConfig) -> Result<Self, CacheError> {
        let provider = config.provider.ok_or(CacheError::NilProvider)?;
        let pairs = parse_pairs(&config.pairs)?;
        if pairs.is_empty() {
            return Err(CacheError::NoPairs);
        }

        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Ok(Self {
            refresher: Arc::new(Refresher {
                pairs,
                provider,
                snapshot: RwLock::new(HashMap::new()),
                updates,
            }),
            ticker: config.ticker,
            lifecycle: Arc::new(Lifecycle::new("price_cache")),
        })
    }

    /// Configured pairs, in refresh order.
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.refresher.pairs
    }

    /// Latest good tick for a pair.
    #[must_use]
    pub fn get(&self, pair: &Pair) -> Option<PriceTick> {
        self.refresher.snapshot.read().get(pair).cloned()
    }

    /// Copy of every cached tick. Pairs whose latest refresh failed keep
    /// their previous tick, or are absent if they never succeeded.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<Pair, PriceTick> {
        self.refresher.snapshot.read().clone()
    }

    /// Receive every successful update.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PriceTick> {
        self.refresher.updates.subscribe()
    }
}

impl Service for PriceCache {
    fn start(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        self.lifecycle.begin()?;

        let ticks = self.ticker.subscribe();
        self.ticker.start(cancel.clone());

        let refresher = Arc::clone(&self.refresher);
        let broadcaster_cancel = cancel.clone();
        tokio::spawn(async move {
            refresher.run(ticks, broadcaster_cancel).await;
        });

        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            cancel.cancelled().await;
            lifecycle.finish(Ok(()));
        });

        Ok(())
    }

    fn wait(&self) -> BoxFuture<'static, Result<(), ServiceError>> {
        self.lifecycle.wait()
    }
}

impl Refresher {
    async fn run(
        &self,
        mut ticks: broadcast::Receiver<chrono::DateTime<chrono::Utc>>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Ok(_) => self.refresh().await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(tag = LOGGER_TAG, skipped, "Ticks skipped by slow cycle");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    async fn refresh(&self) {
        let started = Instant::now();
        for pair in &self.pairs {
            match self.update(pair).await {
                Ok(tick) => {
                    tracing::info!(tag = LOGGER_TAG, pair = %pair, price = %tick.price, "Price update");
                    metrics::record_cache_update(true);
                    self.snapshot.write().insert(pair.clone(), tick.clone());
                    let _ = self.updates.send(tick);
                }
                Err(e) => {
                    tracing::warn!(tag = LOGGER_TAG, pair = %pair, error = %e, "Unable to update price");
                    metrics::record_cache_update(false);
                }
            }
        }
        metrics::record_cache_cycle(started.elapsed());
    }

    async fn update(&self, pair: &Pair) -> Result<PriceTick, UpdateError> {
        let tick = self.provider.price(pair).await?;
        if let Some(message) = tick.error_message() {
            return Err(UpdateError::Tick(message.to_string()));
        }
        Ok(tick)
    }
}

// =============================================================================
// Tests
// =============================================================================
