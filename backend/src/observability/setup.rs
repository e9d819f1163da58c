//! Logger configuration records and fan-out assembly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use serde::Deserialize;

use super::error::LoggerError;
use super::field::Redactor;
use super::format::LogFormat;
use super::level::Level;
use super::logger::{Logger, SinkLogger};
use super::sink::{
    BatchPolicy, ConsoleSink, ConsoleStream, GcpSink, GcpSinkConfig, SeqSink, SeqSinkConfig, Sink,
};
use super::tee::TeeLogger;

fn default_sensitive_keys() -> Vec<String> {
    [
        "password",
        "old_password",
        "new_password",
        "token",
        "secret",
        "authorization",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "json".to_owned()
}

fn default_stream() -> String {
    "stdout".to_owned()
}

const fn default_batch_size() -> usize {
    50
}

const fn default_flush_interval_ms() -> u64 {
    2_000
}

/// `logger.*` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggerConfig {
    /// Keys whose values are replaced before emission.
    #[serde(default = "default_sensitive_keys")]
    pub sensitive_keys: Vec<String>,
    /// Local stream sink.
    #[serde(default)]
    pub console: ConsoleLoggerConfig,
    /// Cloud Logging sink.
    #[serde(default)]
    pub gcp: GcpLoggerConfig,
    /// Remote structured-log sink.
    #[serde(default)]
    pub seq: SeqLoggerConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sensitive_keys: default_sensitive_keys(),
            console: ConsoleLoggerConfig::default(),
            gcp: GcpLoggerConfig::default(),
            seq: SeqLoggerConfig::default(),
        }
    }
}

/// `logger.console.*`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleLoggerConfig {
    /// Build this sink.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum level.
    #[serde(default)]
    pub level: Level,
    /// `text` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
    /// `stdout` or `stderr`.
    #[serde(default = "default_stream")]
    pub stream: String,
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::default(),
            format: default_format(),
            stream: default_stream(),
        }
    }
}

/// `logger.gcp.*`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GcpLoggerConfig {
    /// Build this sink.
    #[serde(default)]
    pub enabled: bool,
    /// Minimum level.
    #[serde(default)]
    pub level: Level,
    /// Project the log belongs to.
    #[serde(default)]
    pub project_id: String,
    /// Log name within the project.
    #[serde(default)]
    pub log_name: String,
    /// Service-account key file.
    #[serde(default)]
    pub credentials_file: String,
    /// Override for the `entries:write` endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Records per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum delay before pending records are sent.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for GcpLoggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::default(),
            project_id: String::new(),
            log_name: String::new(),
            credentials_file: String::new(),
            endpoint: String::new(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

/// `logger.seq.*`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeqLoggerConfig {
    /// Build this sink.
    #[serde(default)]
    pub enabled: bool,
    /// Minimum level.
    #[serde(default)]
    pub level: Level,
    /// Server base URL.
    #[serde(default)]
    pub endpoint: String,
    /// API key sent with every batch.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Also write records to standard output.
    #[serde(default)]
    pub local_echo: bool,
    /// Records per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum delay before pending records are sent.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for SeqLoggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: Level::default(),
            endpoint: String::new(),
            api_key: None,
            local_echo: false,
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

fn batch_policy(batch_size: usize, flush_interval_ms: u64) -> BatchPolicy {
    BatchPolicy {
        max_batch: batch_size,
        flush_interval: Duration::from_millis(flush_interval_ms),
        ..BatchPolicy::default()
    }
}

/// Build the fan-out over every enabled sink.
///
/// Remote sinks spawn their workers, so this must run inside a Tokio
/// runtime when any of them is enabled.
///
/// # Errors
///
/// Returns the construction error of the first misconfigured sink.
pub fn build_logger(config: &LoggerConfig, clock: Arc<dyn Clock>) -> Result<TeeLogger, LoggerError> {
    let redactor = Arc::new(Redactor::new(&config.sensitive_keys));
    let client = reqwest::Client::new();
    let mut children: Vec<Arc<dyn Logger>> = Vec::new();
    let mut attach = |sink: Arc<dyn Sink>, level: Level| {
        children.push(Arc::new(SinkLogger::new(
            sink,
            level,
            Arc::clone(&redactor),
            Arc::clone(&clock),
        )));
    };

    if config.console.enabled {
        let format: LogFormat = config.console.format.parse()?;
        let stream: ConsoleStream = config.console.stream.parse()?;
        attach(
            Arc::new(ConsoleSink::standard(format, stream)),
            config.console.level,
        );
    }

    if config.gcp.enabled {
        let gcp = &config.gcp;
        let sink = GcpSink::new(
            &GcpSinkConfig {
                project_id: gcp.project_id.clone(),
                log_name: gcp.log_name.clone(),
                credentials_file: PathBuf::from(&gcp.credentials_file),
                endpoint: gcp.endpoint.clone(),
                batch: batch_policy(gcp.batch_size, gcp.flush_interval_ms),
            },
            client.clone(),
        )?;
        attach(Arc::new(sink), gcp.level);
    }

    if config.seq.enabled {
        let seq = &config.seq;
        let sink = SeqSink::new(
            &SeqSinkConfig {
                endpoint: seq.endpoint.clone(),
                api_key: seq.api_key.clone(),
                local_echo: seq.local_echo,
                batch: batch_policy(seq.batch_size, seq.flush_interval_ms),
            },
            client,
        )?;
        attach(Arc::new(sink), seq.level);
    }

    Ok(TeeLogger::new(children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::DefaultClock;
    use rstest::rstest;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(DefaultClock)
    }

    #[rstest]
    fn defaults_enable_only_the_console() {
        let config = LoggerConfig::default();
        let logger = build_logger(&config, clock()).expect("default logger");
        assert_eq!(logger.len(), 1);
    }

    #[rstest]
    fn unsupported_console_format_fails_construction() {
        let mut config = LoggerConfig::default();
        config.console.format = "xml".to_owned();
        let error = build_logger(&config, clock()).err().expect("construction fails");
        assert_eq!(error, LoggerError::unsupported_format("xml"));
    }

    #[rstest]
    fn enabled_seq_without_endpoint_fails_construction() {
        let mut config = LoggerConfig::default();
        config.seq.enabled = true;
        let error = build_logger(&config, clock()).err().expect("construction fails");
        assert_eq!(error, LoggerError::missing_endpoint("seq"));
    }

    #[rstest]
    fn enabled_gcp_with_unreadable_credentials_fails_construction() {
        let mut config = LoggerConfig::default();
        config.gcp = GcpLoggerConfig {
            enabled: true,
            project_id: "p".to_owned(),
            log_name: "l".to_owned(),
            credentials_file: "/nonexistent/key.json".to_owned(),
            ..GcpLoggerConfig::default()
        };
        let error = build_logger(&config, clock()).err().expect("construction fails");
        assert!(matches!(error, LoggerError::UnreadableCredentials { .. }));
    }

    #[tokio::test]
    async fn all_sinks_can_be_combined() {
        let mut config = LoggerConfig::default();
        config.seq.enabled = true;
        config.seq.endpoint = "http://127.0.0.1:5341".to_owned();
        let logger = build_logger(&config, clock()).expect("console and seq");
        assert_eq!(logger.len(), 2);
    }

    #[rstest]
    fn yaml_sections_fill_missing_keys_with_defaults() {
        let config: LoggerConfig = serde_yaml::from_str(
            "console:\n  level: WARN\n  format: text\nseq:\n  enabled: true\n  endpoint: http://seq:5341\n",
        )
        .expect("parse yaml");
        assert_eq!(config.console.level, Level::Warn);
        assert_eq!(config.console.format, "text");
        assert!(config.console.enabled);
        assert!(config.seq.enabled);
        assert_eq!(config.seq.batch_size, 50);
        assert!(config.sensitive_keys.contains(&"password".to_owned()));
    }
}
