//! Remote structured-log sink speaking compact log event format (CLEF).

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{Map, Value};

use super::batch::{BatchPolicy, BatchQueue, BatchTransport};
use super::console::ConsoleSink;
use super::Sink;
use crate::observability::error::LoggerError;
use crate::observability::format::LogFormat;
use crate::observability::level::Level;
use crate::observability::logger::LogRecord;

const SINK: &str = "seq";
const API_KEY_HEADER: &str = "X-Seq-ApiKey";
const CLEF_CONTENT_TYPE: &str = "application/vnd.serilog.clef";

/// Settings for [`SeqSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqSinkConfig {
    /// Server base URL, e.g. `http://seq:5341`.
    pub endpoint: String,
    /// Sent as `X-Seq-ApiKey` when present.
    pub api_key: Option<String>,
    /// Also write every record to standard output.
    pub local_echo: bool,
    /// Batching limits.
    pub batch: BatchPolicy,
}

const fn clef_level(level: Level) -> &'static str {
    match level {
        Level::Debug => "Debug",
        Level::Info => "Information",
        Level::Warn => "Warning",
        Level::Error => "Error",
        Level::Panic | Level::Fatal => "Fatal",
    }
}

/// Encode `record` as a CLEF event with `@t`, `@l` and `@mt`.
///
/// Field keys starting with `@` are escaped by doubling the sigil.
#[must_use]
pub fn clef_event(record: &LogRecord) -> Value {
    let mut event = Map::new();
    event.insert(
        "@t".to_owned(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    event.insert(
        "@l".to_owned(),
        Value::String(clef_level(record.level).to_owned()),
    );
    event.insert("@mt".to_owned(), Value::String(record.message.clone()));
    for field in &record.fields {
        let key = if field.key().starts_with('@') {
            format!("@{}", field.key())
        } else {
            field.key().to_owned()
        };
        event.insert(key, field.value().clone());
    }
    Value::Object(event)
}

struct SeqTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[async_trait]
impl BatchTransport for SeqTransport {
    async fn deliver(&self, batch: Vec<Value>) -> Result<(), LoggerError> {
        let body = batch
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, CLEF_CONTENT_TYPE)
            .body(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(drop)
            .map_err(|error| LoggerError::delivery(SINK, error.to_string()))
    }
}

/// Sink posting CLEF batches to a structured-log server.
pub struct SeqSink {
    queue: BatchQueue,
    echo: Option<ConsoleSink>,
}

impl SeqSink {
    /// Validate `config` and start the delivery worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::MissingEndpoint`] for an empty endpoint and
    /// [`LoggerError::InvalidEndpoint`] when it does not parse as a URL.
    pub fn new(config: &SeqSinkConfig, client: reqwest::Client) -> Result<Self, LoggerError> {
        let base = config.endpoint.trim();
        if base.is_empty() {
            return Err(LoggerError::missing_endpoint(SINK));
        }
        let url = format!("{}/api/events/raw", base.trim_end_matches('/'));
        url::Url::parse(&url)
            .map_err(|error| LoggerError::invalid_endpoint(SINK, error.to_string()))?;
        let transport = SeqTransport {
            client,
            url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        };
        let echo = config
            .local_echo
            .then(|| ConsoleSink::standard(LogFormat::Json, super::ConsoleStream::Stdout));
        Ok(Self {
            queue: BatchQueue::spawn(SINK, transport, config.batch),
            echo,
        })
    }

    /// Whether records are echoed locally.
    #[must_use]
    pub const fn echoes_locally(&self) -> bool {
        self.echo.is_some()
    }
}

#[async_trait]
impl Sink for SeqSink {
    fn name(&self) -> &'static str {
        SINK
    }

    fn write(&self, record: &LogRecord) {
        self.queue.push(clef_event(record));
        if let Some(echo) = &self.echo {
            echo.write(record);
        }
    }

    async fn flush(&self) -> Result<(), LoggerError> {
        let remote = self.queue.flush().await;
        if let Some(echo) = &self.echo {
            echo.flush().await?;
        }
        remote
    }
}
