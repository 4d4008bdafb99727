//! Price Ticks and Models
//!
//! Canonical representation of what a price provider returns: a tick is one
//! observation of a pair at one instant, a model describes how the provider
//! resolves a pair.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::pair::Pair;

/// Free-form key/value parameters attached by the provider.
pub type Parameters = BTreeMap<String, String>;

// =============================================================================
// Price Tick
// =============================================================================

/// Result of resolving one pair at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    /// Kind of node that produced the tick (e.g. `origin`, `median`).
    pub kind: String,
    /// Pair the tick belongs to.
    pub pair: Pair,
    /// Resolved price.
    pub price: Decimal,
    /// Best bid, if known.
    pub bid: Option<Decimal>,
    /// Best ask, if known.
    pub ask: Option<Decimal>,
    /// Traded volume over the last 24 hours, if known.
    pub volume_24h: Option<Decimal>,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Provider parameters.
    pub parameters: Parameters,
    /// Constituent ticks of an aggregated pair.
    pub ticks: Vec<PriceTick>,
    /// Set when the tick is unusable.
    pub error: Option<String>,
}

impl PriceTick {
    /// Create a tick with only a price set.
    #[must_use]
    pub fn new(pair: Pair, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: String::new(),
            pair,
            price,
            bid: None,
            ask: None,
            volume_24h: None,
            timestamp,
            parameters: Parameters::new(),
            ticks: Vec::new(),
            error: None,
        }
    }

    /// Set the tick kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the error marker.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// The error marker, when it carries a non-empty message.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    /// Whether the tick can be served.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.error_message().is_none()
    }
}

// =============================================================================
// Price Model
// =============================================================================

/// How a provider resolves a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceModel {
    /// Kind of node (e.g. `origin`, `median`).
    pub kind: String,
    /// Pair resolved by this node.
    pub pair: Pair,
    /// Node parameters.
    pub parameters: Parameters,
    /// Child nodes.
    pub models: Vec<PriceModel>,
}

impl PriceModel {
    /// Derive the model tree that produced a tick.
    #[must_use]
    pub fn from_tick(tick: &PriceTick) -> Self {
        Self {
            kind: tick.kind.clone(),
            pair: tick.pair.clone(),
            parameters: tick.parameters.clone(),
            models: tick.ticks.iter().map(Self::from_tick).collect(),
        }
    }
}
