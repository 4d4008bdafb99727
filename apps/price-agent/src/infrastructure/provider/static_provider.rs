//! Static Price Provider
//!
//! Price table loaded once from a JSON file:
//!
//! ```json
//! {"prices":[{"type":"median","base":"ETH","quote":"USD","price":2500.5,"ts":"2024-01-01T00:00:00Z"}]}
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::ports::{PriceMap, PriceProvider, ProviderError};
use crate::domain::pair::Pair;
use crate::domain::price::{PriceModel, PriceTick};
use crate::infrastructure::marshal::PriceRecord;

/// On-disk price table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable {
    /// Flattened price records.
    #[serde(default)]
    pub prices: Vec<PriceRecord>,
}

/// Provider backed by a fixed set of ticks.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceProvider {
    ticks: BTreeMap<Pair, PriceTick>,
}

impl StaticPriceProvider {
    /// Load a price table from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the file cannot be read and
    /// `ProviderError::InvalidData` if it is not a valid table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ProviderError::Unavailable {
            message: format!("{}: {e}", path.display()),
        })?;
        let table: PriceTable =
            serde_json::from_str(&content).map_err(|e| ProviderError::InvalidData {
                message: format!("{}: {e}", path.display()),
            })?;

        let provider = Self::from_ticks(table.prices.into_iter().map(PriceTick::from));
        tracing::debug!(path = %path.display(), pairs = provider.ticks.len(), "Price table loaded");
        Ok(provider)
    }

    /// Build a provider from ticks. A later tick for the same pair wins.
    #[must_use]
    pub fn from_ticks(ticks: impl IntoIterator<Item = PriceTick>) -> Self {
        Self {
            ticks: ticks
                .into_iter()
                .map(|tick| (tick.pair.clone(), tick))
                .collect(),
        }
    }

    /// Pairs in the table.
    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.ticks.keys()
    }
}

#[async_trait]
impl PriceProvider for StaticPriceProvider {
    async fn price(&self, pair: &Pair) -> Result<PriceTick, ProviderError> {
        self.ticks
            .get(pair)
            .cloned()
            .ok_or_else(|| ProviderError::PairNotFound(pair.clone()))
    }

    async fn prices(&self, pairs: &[Pair]) -> Result<PriceMap, ProviderError> {
        Ok(pairs
            .iter()
            .filter_map(|pair| self.ticks.get_key_value(pair))
            .map(|(pair, tick)| (pair.clone(), tick.clone()))
            .collect())
    }

    async fn models(&self, pairs: &[Pair]) -> Result<HashMap<Pair, PriceModel>, ProviderError> {
        if pairs.is_empty() {
            return Ok(self
                .ticks
                .iter()
                .map(|(pair, tick)| (pair.clone(), PriceModel::from_tick(tick)))
                .collect());
        }

        pairs
            .iter()
            .map(|pair| {
                self.ticks
                    .get(pair)
                    .map(|tick| (pair.clone(), PriceModel::from_tick(tick)))
                    .ok_or_else(|| ProviderError::PairNotFound(pair.clone()))
            })
            .collect()
    }
}
