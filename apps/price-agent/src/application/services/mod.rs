//! Application Services
//!
//! Long-running services built on the lifecycle contract.
//!
//! - `PriceCache`: Periodically refreshes prices for a fixed set of pairs

mod price_cache;

pub use price_cache::{CacheError, LOGGER_TAG, PriceCache, PriceCacheConfig, UpdateError};
