//! Collaborator Adapters
//!
//! Concrete provider and hook implementations used by the binary.
//!
//! - `StaticPriceProvider`: Serves prices from a JSON price table
//! - `NoopPriceHook`: Accepts every price
//! - `MaxAgeHook`: Rejects stale or error-marked prices

mod hooks;
mod static_provider;

pub use hooks::{MaxAgeHook, NoopPriceHook};
pub use static_provider::{PriceTable, StaticPriceProvider};
