//! Marshaller Port (Driven Port)
//!
//! Serializes records onto output streams. Writes may be buffered until
//! `flush`.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::price::{PriceModel, PriceTick};

/// Output stream shared between a caller and the marshaller.
pub type SharedWriter = Arc<Mutex<dyn io::Write + Send>>;

/// A value that can be marshalled.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    /// A resolved price.
    Price(&'a PriceTick),
    /// A provider model.
    Model(&'a PriceModel),
    /// An error to report in-band.
    Error(&'a (dyn std::error::Error + Send + Sync)),
}

/// Marshalling error.
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    /// A record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Encoded output could not be written.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Port for serializing records.
pub trait Marshaller: Send + Sync {
    /// Marshal a record for the given stream.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError::Encode` if the record cannot be encoded.
    fn write(&self, out: &SharedWriter, record: Record<'_>) -> Result<(), MarshalError>;

    /// Write everything buffered so far to its stream.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError::Io` if any stream fails.
    fn flush(&self) -> Result<(), MarshalError>;
}
