//! Local-stream sink.

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::Sink;
use crate::observability::error::LoggerError;
use crate::observability::format::LogFormat;
use crate::observability::logger::LogRecord;

/// Standard stream a console sink writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleStream {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}

impl FromStr for ConsoleStream {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            other => Err(LoggerError::unsupported_stream(other)),
        }
    }
}

/// Writes one rendered line per record to a byte stream.
pub struct ConsoleSink {
    format: LogFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Write to an arbitrary stream.
    pub fn new(format: LogFormat, out: impl Write + Send + 'static) -> Self {
        Self {
            format,
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Write to the given standard stream.
    #[must_use]
    pub fn standard(format: LogFormat, stream: ConsoleStream) -> Self {
        match stream {
            ConsoleStream::Stdout => Self::new(format, io::stdout()),
            ConsoleStream::Stderr => Self::new(format, io::stderr()),
        }
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, record: &LogRecord) {
        let mut line = self.format.render(record);
        line.push('\n');
        let Ok(mut out) = self.out.lock() else {
            debug!(sink = "console", "stream lock poisoned; record dropped");
            return;
        };
        if let Err(error) = out.write_all(line.as_bytes()) {
            debug!(sink = "console", %error, "record dropped");
        }
    }

    async fn flush(&self) -> Result<(), LoggerError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| LoggerError::io("console", "stream lock poisoned"))?;
        out.flush()
            .map_err(|error| LoggerError::io("console", error.to_string()))
    }
}
