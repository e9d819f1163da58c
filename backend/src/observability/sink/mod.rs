//! Log record destinations.
//!
//! A sink receives finished records through [`Sink::write`], which must not
//! block on I/O and must swallow its own failures. Remote sinks enqueue into
//! a [`BatchQueue`] drained by a background task.

mod batch;
mod console;
mod gcp;
mod seq;

pub use batch::{BatchPolicy, BatchQueue, BatchTransport};
pub use console::{ConsoleSink, ConsoleStream};
pub use gcp::{GcpSink, GcpSinkConfig, gcp_severity};
pub use seq::{SeqSink, SeqSinkConfig, clef_event};

use async_trait::async_trait;

use super::error::LoggerError;
use super::logger::LogRecord;

/// Destination for finished log records.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short sink name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Accept one record. Failures are swallowed.
    fn write(&self, record: &LogRecord);

    /// Deliver anything buffered.
    ///
    /// # Errors
    ///
    /// Returns the delivery or I/O failure encountered while flushing.
    async fn flush(&self) -> Result<(), LoggerError>;
}
