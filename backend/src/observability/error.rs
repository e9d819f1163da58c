//! Errors raised while building or flushing loggers.

use crate::macros::define_error;

define_error! {
    /// Construction and flush failures for log sinks.
    ///
    /// Runtime write failures never surface as this type; sinks swallow them.
    pub enum LoggerError {
        /// The configured record format is not `text` or `json`.
        UnsupportedFormat { format: String } => "unsupported log format: {format}",
        /// The configured console stream is not `stdout` or `stderr`.
        UnsupportedStream { stream: String } => "unsupported log stream: {stream}",
        /// A remote sink was enabled without an endpoint.
        MissingEndpoint { sink: String } => "{sink} sink requires an endpoint",
        /// The endpoint could not be parsed as a URL.
        InvalidEndpoint { sink: String, message: String } =>
            "{sink} sink endpoint is invalid: {message}",
        /// A required setting is empty.
        MissingSetting { sink: String, key: String } => "{sink} sink requires {key}",
        /// The credentials file could not be read.
        UnreadableCredentials { path: String, message: String } =>
            "credentials at {path} are unreadable: {message}",
        /// The credentials file was read but is not usable.
        InvalidCredentials { message: String } => "credentials are invalid: {message}",
        /// A batch could not be delivered during a flush.
        Delivery { sink: String, message: String } => "{sink} delivery failed: {message}",
        /// The sink's background worker has stopped.
        Closed { sink: String } => "{sink} sink is no longer running",
        /// Local stream I/O failed during a flush.
        Io { sink: String, message: String } => "{sink} sink i/o failed: {message}",
    }
}
