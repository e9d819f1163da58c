//! The logging capability shared by every layer.
//!
//! [`Logger`] is the only logging type components depend on. A
//! [`SinkLogger`] filters by level, merges bound fields, redacts sensitive
//! keys and hands finished records to one [`Sink`]. Several of them are
//! combined with [`TeeLogger`](super::TeeLogger).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;

use super::context::RequestContext;
use super::error::LoggerError;
use super::field::{Field, Redactor};
use super::level::Level;
use super::sink::Sink;

/// A finished record as delivered to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: Level,
    /// Message template.
    pub message: String,
    /// Bound fields followed by call-site fields, already redacted.
    pub fields: Vec<Field>,
}

/// Structured logger with bound fields and context enrichment.
#[async_trait]
pub trait Logger: Send + Sync {
    /// Emit a record at `level`.
    fn log(&self, level: Level, message: &str, fields: &[Field]);

    /// Child logger that prepends `fields` to every record.
    fn with(&self, fields: &[Field]) -> Arc<dyn Logger>;

    /// Child logger carrying the trace and span ids found in `ctx`.
    ///
    /// Without a valid span the child is equivalent to `self`.
    fn with_context(&self, ctx: &RequestContext) -> Arc<dyn Logger>;

    /// Flush buffered records.
    ///
    /// # Errors
    ///
    /// Returns the sink's flush failure.
    async fn sync(&self) -> Result<(), LoggerError>;

    /// Emit at [`Level::Debug`].
    fn debug(&self, message: &str, fields: &[Field]) {
        self.log(Level::Debug, message, fields);
    }

    /// Emit at [`Level::Info`].
    fn info(&self, message: &str, fields: &[Field]) {
        self.log(Level::Info, message, fields);
    }

    /// Emit at [`Level::Warn`].
    fn warn(&self, message: &str, fields: &[Field]) {
        self.log(Level::Warn, message, fields);
    }

    /// Emit at [`Level::Error`].
    fn error(&self, message: &str, fields: &[Field]) {
        self.log(Level::Error, message, fields);
    }
}

/// The `trace` field for `ctx`, when it carries a valid span.
#[must_use]
pub fn trace_field(ctx: &RequestContext) -> Option<Field> {
    ctx.span_context()
        .filter(|span| span.is_valid())
        .map(|span| {
            Field::new(
                "trace",
                json!({
                    "trace_id": span.trace_id.to_string(),
                    "span_id": span.span_id.to_string(),
                }),
            )
        })
}

/// Logger writing to a single sink.
#[derive(Clone)]
pub struct SinkLogger {
    sink: Arc<dyn Sink>,
    min_level: Level,
    bound: Arc<[Field]>,
    redactor: Arc<Redactor>,
    clock: Arc<dyn Clock>,
}

impl SinkLogger {
    /// Build a logger emitting records at or above `min_level` to `sink`.
    pub fn new(
        sink: Arc<dyn Sink>,
        min_level: Level,
        redactor: Arc<Redactor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sink,
            min_level,
            bound: Arc::from(Vec::new()),
            redactor,
            clock,
        }
    }

    /// Minimum level this logger emits.
    #[must_use]
    pub const fn min_level(&self) -> Level {
        self.min_level
    }

    fn child(&self, extra: &[Field]) -> Self {
        let mut bound = self.bound.to_vec();
        bound.extend_from_slice(extra);
        Self {
            bound: bound.into(),
            ..self.clone()
        }
    }
}

#[async_trait]
impl Logger for SinkLogger {
    fn log(&self, level: Level, message: &str, fields: &[Field]) {
        if level < self.min_level {
            return;
        }
        let mut merged = self.bound.to_vec();
        merged.extend_from_slice(fields);
        let record = LogRecord {
            timestamp: self.clock.utc(),
            level,
            message: message.to_owned(),
            fields: self.redactor.redact(&merged),
        };
        self.sink.write(&record);
    }

    fn with(&self, fields: &[Field]) -> Arc<dyn Logger> {
        Arc::new(self.child(fields))
    }

    fn with_context(&self, ctx: &RequestContext) -> Arc<dyn Logger> {
        match trace_field(ctx) {
            Some(field) => Arc::new(self.child(&[field])),
            None => Arc::new(self.clone()),
        }
    }

    async fn sync(&self) -> Result<(), LoggerError> {
        self.sink.flush().await
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

#[async_trait]
impl Logger for NopLogger {
    fn log(&self, _level: Level, _message: &str, _fields: &[Field]) {}

    fn with(&self, _fields: &[Field]) -> Arc<dyn Logger> {
        Arc::new(Self)
    }

    fn with_context(&self, _ctx: &RequestContext) -> Arc<dyn Logger> {
        Arc::new(Self)
    }

    async fn sync(&self) -> Result<(), LoggerError> {
        Ok(())
    }
}
