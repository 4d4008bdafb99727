#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Price Agent - Price Oracle Query Service
//!
//! Exposes prices computed by a provider graph through a one-shot CLI and a
//! long-running HTTP agent, with an optional polling cache that keeps a set
//! of pairs warm.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pairs, price ticks and models
//!
//! - **Application**: Lifecycle contract, ports and services
//!   - `lifecycle`: Start-once / wait-once service protocol
//!   - `ports`: Provider, hook and marshaller interfaces
//!   - `services`: Polling price cache
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `http`: HTTP query agent
//!   - `marshal`: Newline-delimited JSON marshaller
//!   - `provider`: Static price table and price hooks
//!   - `config`: Environment configuration and service composition
//!   - `cli`: Command runners
//!
//! # Data Flow
//!
//! ```text
//!                 ┌──────────────┐     ┌─────────────┐
//! HTTP request ──►│  HTTP Agent  │────►│  Provider   │
//!                 │              │◄────│             │
//!                 └──────┬───────┘     └─────────────┘
//!                        │ hook check, marshal
//!                        ▼
//!                  JSON response
//!
//! Ticker ──► Price Cache ──► provider.price(pair) ──► snapshot + updates
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core price types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::pair::{Pair, PairError};
pub use domain::price::{PriceModel, PriceTick};

// Lifecycle and ports
pub use application::lifecycle::{Service, ServiceError};
pub use application::ports::{
    HookError, MarshalError, Marshaller, PriceHook, PriceMap, PriceProvider, ProviderError, Record,
    SharedWriter,
};
pub use application::services::{CacheError, PriceCache, PriceCacheConfig};

// Adapters
pub use infrastructure::config::{AgentConfig, ClientServices, ConfigError};
pub use infrastructure::http::{HttpAgent, HttpAgentConfig};
pub use infrastructure::marshal::{JsonMarshaller, PriceRecord};
pub use infrastructure::provider::{MaxAgeHook, NoopPriceHook, StaticPriceProvider};
pub use infrastructure::ticker::Ticker;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
