//! Configuration Module
//!
//! Configuration loading and dependency injection for the price agent.

mod services;
mod settings;

pub use services::ClientServices;
pub use settings::{AgentConfig, CacheSettings, ConfigError, ProviderSettings, ServerSettings};
