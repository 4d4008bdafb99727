//! Price Provider Port (Driven Port)
//!
//! Interface to the provider graph that resolves pairs to prices.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::pair::Pair;
use crate::domain::price::{PriceModel, PriceTick};

/// Prices keyed by pair.
pub type PriceMap = HashMap<Pair, PriceTick>;

/// Price provider error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider has no way to resolve the pair.
    #[error("pair {0} is not supported")]
    PairNotFound(Pair),

    /// The price source could not be reached or read.
    #[error("price source unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The price source returned data that could not be interpreted.
    #[error("invalid price data: {message}")]
    InvalidData {
        /// Error details.
        message: String,
    },
}

/// Port for resolving prices.
///
/// Implementations are shared across request handlers and background loops
/// and must tolerate concurrent calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Resolve the price of a single pair.
    async fn price(&self, pair: &Pair) -> Result<PriceTick, ProviderError>;

    /// Resolve prices for several pairs.
    ///
    /// Pairs the provider could not resolve may be absent from the result.
    async fn prices(&self, pairs: &[Pair]) -> Result<PriceMap, ProviderError>;

    /// Describe how the given pairs are resolved. An empty slice asks for
    /// every supported pair.
    async fn models(&self, pairs: &[Pair]) -> Result<HashMap<Pair, PriceModel>, ProviderError>;
}
