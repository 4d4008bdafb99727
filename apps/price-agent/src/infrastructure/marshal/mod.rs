//! JSON Marshaller
//!
//! Implements the `Marshaller` port. Records are encoded when written, so
//! encoding failures surface per record; encoded bytes are buffered together
//! with their destination stream and written on `flush` as newline-delimited
//! JSON objects.

mod record;

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

pub use record::{ErrorRecord, ModelRecord, PriceRecord};

use crate::application::ports::{MarshalError, Marshaller, Record, SharedWriter};

/// Newline-delimited JSON marshaller.
///
/// Safe to share between concurrent writers: each buffered chunk keeps its
/// own destination, and `flush` writes under the buffer lock so a flush
/// returns only after every chunk written before it reached its stream.
#[derive(Default)]
pub struct JsonMarshaller {
    pending: Mutex<Vec<(SharedWriter, Vec<u8>)>>,
}

impl JsonMarshaller {
    /// Create an empty marshaller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(record: Record<'_>) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = match record {
            Record::Price(tick) => serde_json::to_vec(&PriceRecord::from(tick))?,
            Record::Model(model) => serde_json::to_vec(&ModelRecord::from(model))?,
            Record::Error(error) => serde_json::to_vec(&ErrorRecord {
                error: error.to_string(),
            })?,
        };
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl Marshaller for JsonMarshaller {
    fn write(&self, out: &SharedWriter, record: Record<'_>) -> Result<(), MarshalError> {
        let bytes = Self::encode(record)?;
        self.pending.lock().push((Arc::clone(out), bytes));
        Ok(())
    }

    fn flush(&self) -> Result<(), MarshalError> {
        let mut pending = self.pending.lock();
        let mut first_error = None;

        for (out, bytes) in pending.drain(..) {
            let mut out = out.lock();
            if let Err(e) = out.write_all(&bytes).and_then(|()| out.flush()) {
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), |e| Err(MarshalError::Io(e)))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::pair::Pair;
    use crate::domain::price::PriceTick;

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn buffer() -> (Arc<Mutex<Vec<u8>>>, SharedWriter) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer: SharedWriter = buffer.clone();
        (buffer, writer)
    }

    #[test]
    fn nothing_is_written_before_flush() {
        let marshaller = JsonMarshaller::new();
        let (buffer, out) = buffer();
        let tick = PriceTick::new(Pair::new("ETH", "USD"), Decimal::new(2500, 0), Utc::now());

        marshaller.write(&out, Record::Price(&tick)).unwrap();
        assert!(buffer.lock().is_empty());

        marshaller.flush().unwrap();
        let text = String::from_utf8(buffer.lock().clone()).unwrap();
        assert!(text.starts_with(r#"{"type":"","base":"ETH","quote":"USD","price":2500.0"#));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn flush_routes_records_to_their_streams() {
        let marshaller = JsonMarshaller::new();
        let (first, first_out) = buffer();
        let (second, second_out) = buffer();
        let err = io::Error::other("upstream down");

        marshaller.write(&first_out, Record::Error(&err)).unwrap();
        marshaller.write(&second_out, Record::Error(&err)).unwrap();
        marshaller.write(&first_out, Record::Error(&err)).unwrap();
        marshaller.flush().unwrap();

        let first = String::from_utf8(first.lock().clone()).unwrap();
        let second = String::from_utf8(second.lock().clone()).unwrap();
        assert_eq!(first.lines().count(), 2);
        assert_eq!(second, "{\"error\":\"upstream down\"}\n");
    }

    #[test]
    fn flush_reports_io_failure_and_keeps_going() {
        let marshaller = JsonMarshaller::new();
        let broken: SharedWriter = Arc::new(Mutex::new(BrokenPipe));
        let (buffer, out) = buffer();
        let err = io::Error::other("x");

        marshaller.write(&broken, Record::Error(&err)).unwrap();
        marshaller.write(&out, Record::Error(&err)).unwrap();

        assert!(matches!(marshaller.flush(), Err(MarshalError::Io(_))));
        assert!(!buffer.lock().is_empty());
        // Buffer is drained even on failure.
        assert!(marshaller.flush().is_ok());
    }
}
