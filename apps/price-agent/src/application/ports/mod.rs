//! Port Interfaces
//!
//! Defines the interfaces (ports) for the external collaborators the core
//! depends on. Infrastructure adapters implement these contracts.
//!
//! ## Driven Ports (Outbound)
//!
//! - `PriceProvider`: Resolves pairs to price ticks and models
//! - `PriceHook`: Sanity-checks prices before they are served
//! - `Marshaller`: Serializes records to output streams

mod marshaller_port;
mod price_hook_port;
mod price_provider_port;

pub use marshaller_port::{MarshalError, Marshaller, Record, SharedWriter};
pub use price_hook_port::{HookError, PriceHook};
pub use price_provider_port::{PriceMap, PriceProvider, ProviderError};

#[cfg(test)]
pub use price_hook_port::MockPriceHook;
#[cfg(test)]
pub use price_provider_port::MockPriceProvider;
