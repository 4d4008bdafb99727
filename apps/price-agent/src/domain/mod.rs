//! Domain Layer - Core price types.
//!
//! Pairs, price ticks and price models. Pure data with no I/O; serialization
//! formats live in the infrastructure layer.

/// Asset pairs and pair parsing.
pub mod pair;

/// Price ticks and provider models.
pub mod price;
