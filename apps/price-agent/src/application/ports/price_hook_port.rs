//! Price Hook Port (Driven Port)
//!
//! Sanity check applied to a batch of prices before they are served.

use async_trait::async_trait;

use super::PriceMap;
use crate::domain::pair::Pair;

/// Price check failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// A price did not pass the check.
    #[error("price for {pair} rejected: {reason}")]
    Rejected {
        /// Offending pair.
        pair: Pair,
        /// Why it was rejected.
        reason: String,
    },
}

/// Port for validating prices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHook: Send + Sync {
    /// Check a batch of prices.
    async fn check(&self, prices: &PriceMap) -> Result<(), HookError>;
}
