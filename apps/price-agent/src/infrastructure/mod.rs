//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the outer surfaces (HTTP, CLI).

/// Command runners for the binary.
pub mod cli;

/// Configuration and dependency injection.
pub mod config;

/// HTTP query agent.
pub mod http;

/// JSON marshaller and wire records.
pub mod marshal;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Price provider and hook adapters.
pub mod provider;

/// Logging and OpenTelemetry tracing setup.
pub mod telemetry;

/// Tick scheduling for the polling cache.
pub mod ticker;
