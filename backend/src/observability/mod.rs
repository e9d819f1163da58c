//! Logging, tracing, request context and token handling.
//!
//! Every component logs through [`Logger`], a fan-out over configured
//! sinks, and opens spans through [`Tracer`]. Both read trace correlation
//! from the [`RequestContext`] handed down each call.

mod context;
mod error;
mod field;
mod format;
pub mod jwt;
mod level;
mod logger;
mod setup;
pub mod sink;
mod tee;
mod trace_id;
mod tracer;

pub use context::{CancelHandle, ContextError, RequestContext, SpanContext};
pub use error::LoggerError;
pub use field::{Field, REDACTED, Redactor, error_chain};
pub use format::LogFormat;
pub use jwt::{Jwt, JwtConfig, JwtError};
pub use level::Level;
pub use logger::{LogRecord, Logger, NopLogger, SinkLogger, trace_field};
pub use setup::{
    ConsoleLoggerConfig, GcpLoggerConfig, LoggerConfig, SeqLoggerConfig, build_logger,
};
pub use tee::TeeLogger;
pub use trace_id::{SpanId, TraceId};
pub use tracer::{Span, Tracer, TracerConfig};
