//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the lifecycle contract, the long-running services
//! built on it, and the port interfaces for external collaborators.

/// Start-once / wait-once service lifecycle.
pub mod lifecycle;

/// Port interfaces for external collaborators (provider, hook, marshaller).
pub mod ports;

/// Application services (polling cache).
pub mod services;
