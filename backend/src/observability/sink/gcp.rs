//! Cloud Logging sink.
//!
//! Records are shaped as `entries:write` log entries and delivered in
//! batches under `projects/{project}/logs/{log_name}`. Access tokens come
//! from the service-account key file through the JWT bearer grant and are
//! cached until shortly before they expire.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use super::batch::{BatchPolicy, BatchQueue, BatchTransport};
use super::Sink;
use crate::observability::error::LoggerError;
use crate::observability::level::Level;
use crate::observability::logger::LogRecord;

const SINK: &str = "gcp";
const MESSAGE_KEY: &str = "message";
const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com/v2/entries:write";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const LOGGING_SCOPE: &str = "https://www.googleapis.com/auth/logging.write";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Map a level onto the Cloud Logging severity enum.
#[must_use]
pub const fn gcp_severity(level: Level) -> &'static str {
    match level {
        Level::Debug => "DEBUG",
        Level::Info => "INFO",
        Level::Warn => "WARNING",
        Level::Error => "ERROR",
        Level::Panic | Level::Fatal => "CRITICAL",
    }
}

/// Settings for [`GcpSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpSinkConfig {
    /// Project the log belongs to.
    pub project_id: String,
    /// Log name within the project.
    pub log_name: String,
    /// Service-account key file.
    pub credentials_file: PathBuf,
    /// `entries:write` endpoint; empty selects the public API.
    pub endpoint: String,
    /// Batching limits.
    pub batch: BatchPolicy,
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

struct ServiceAccountAuth {
    client: reqwest::Client,
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    fn from_file(path: &Path, client: reqwest::Client) -> Result<Self, LoggerError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            LoggerError::unreadable_credentials(path.display().to_string(), error.to_string())
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|error| LoggerError::invalid_credentials(error.to_string()))?;
        let encoding = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|error| LoggerError::invalid_credentials(error.to_string()))?;
        Ok(Self {
            client,
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_owned()),
            key: encoding,
            cached: Mutex::new(None),
        })
    }

    async fn token(&self) -> Result<String, LoggerError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.refresh_at > Instant::now()) {
            return Ok(token.value.clone());
        }
        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, LoggerError> {
        let now = Utc::now().timestamp();
        let claims = GrantClaims {
            iss: &self.client_email,
            scope: LOGGING_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|error| LoggerError::invalid_credentials(error.to_string()))?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer")
            .append_pair("assertion", &assertion)
            .finish();
        let response = self
            .client
            .post(&self.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| LoggerError::delivery(SINK, error.to_string()))?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|error| LoggerError::delivery(SINK, error.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

struct GcpTransport {
    client: reqwest::Client,
    endpoint: String,
    log_name: String,
    project_id: String,
    auth: ServiceAccountAuth,
}

#[async_trait]
impl BatchTransport for GcpTransport {
    async fn deliver(&self, batch: Vec<Value>) -> Result<(), LoggerError> {
        let token = self.auth.token().await?;
        let body = json!({
            "logName": self.log_name,
            "resource": { "type": "global", "labels": { "project_id": self.project_id } },
            "entries": batch,
        });
        self.client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(drop)
            .map_err(|error| LoggerError::delivery(SINK, error.to_string()))
    }
}

/// Shape `record` as a Cloud Logging entry.
///
/// A bound field named `message` is kept as `fields.message`.
#[must_use]
pub(crate) fn log_entry(record: &LogRecord) -> Value {
    let mut payload = Map::new();
    for field in &record.fields {
        let key = if field.key() == MESSAGE_KEY {
            format!("fields.{MESSAGE_KEY}")
        } else {
            field.key().to_owned()
        };
        payload.insert(key, field.value().clone());
    }
    // Written last so a bound field can never replace the log message.
    payload.insert(MESSAGE_KEY.to_owned(), Value::String(record.message.clone()));
    json!({
        "severity": gcp_severity(record.level),
        "timestamp": record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        "jsonPayload": payload,
    })
}

/// Sink batching records to Cloud Logging.
pub struct GcpSink {
    queue: BatchQueue,
}

impl GcpSink {
    /// Validate `config`, load the service-account key and start the worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::MissingSetting`] for an empty project or log
    /// name, [`LoggerError::InvalidEndpoint`] for an unparsable endpoint,
    /// [`LoggerError::UnreadableCredentials`] when the key file cannot be
    /// read and [`LoggerError::InvalidCredentials`] when it is not a usable
    /// service-account key.
    pub fn new(config: &GcpSinkConfig, client: reqwest::Client) -> Result<Self, LoggerError> {
        if config.project_id.trim().is_empty() {
            return Err(LoggerError::missing_setting(SINK, "project_id"));
        }
        if config.log_name.trim().is_empty() {
            return Err(LoggerError::missing_setting(SINK, "log_name"));
        }
        let endpoint = if config.endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_owned()
        } else {
            config.endpoint.clone()
        };
        url::Url::parse(&endpoint)
            .map_err(|error| LoggerError::invalid_endpoint(SINK, error.to_string()))?;
        let auth = ServiceAccountAuth::from_file(&config.credentials_file, client.clone())?;
        let transport = GcpTransport {
            client,
            endpoint,
            log_name: format!("projects/{}/logs/{}", config.project_id, config.log_name),
            project_id: config.project_id.clone(),
            auth,
        };
        Ok(Self {
            queue: BatchQueue::spawn(SINK, transport, config.batch),
        })
    }
}

#[async_trait]
impl Sink for GcpSink {
    fn name(&self) -> &'static str {
        SINK
    }

    fn write(&self, record: &LogRecord) {
        self.queue.push(log_entry(record));
    }

    async fn flush(&self) -> Result<(), LoggerError> {
        self.queue.flush().await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::observability::Field;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use tempfile::NamedTempFile;

    #[fixture]
    fn config() -> GcpSinkConfig {
        GcpSinkConfig {
            project_id: "members-prod".to_owned(),
            log_name: "member-service".to_owned(),
            credentials_file: PathBuf::from("/nonexistent/service-account.json"),
            endpoint: String::new(),
            batch: BatchPolicy::default(),
        }
    }

    #[rstest]
    #[case(Level::Debug, "DEBUG")]
    #[case(Level::Info, "INFO")]
    #[case(Level::Warn, "WARNING")]
    #[case(Level::Error, "ERROR")]
    #[case(Level::Panic, "CRITICAL")]
    #[case(Level::Fatal, "CRITICAL")]
    fn severities_follow_the_service_enum(#[case] level: Level, #[case] expected: &str) {
        assert_eq!(gcp_severity(level), expected);
    }

    #[rstest]
    fn entries_carry_severity_timestamp_and_payload() {
        let record = LogRecord {
            timestamp: Utc
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
            level: Level::Error,
            message: "insert failed".to_owned(),
            fields: vec![Field::new("op", "create")],
        };
        assert_eq!(
            log_entry(&record),
            json!({
                "severity": "ERROR",
                "timestamp": "2025-01-01T00:00:00.000000000Z",
                "jsonPayload": { "message": "insert failed", "op": "create" },
            })
        );
    }

    #[rstest]
    fn message_field_does_not_replace_the_log_message() {
        let record = LogRecord {
            timestamp: Utc
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
            level: Level::Info,
            message: "member created".to_owned(),
            fields: vec![Field::new("message", "from the caller")],
        };

        let entry = log_entry(&record);

        assert_eq!(entry["jsonPayload"]["message"], "member created");
        assert_eq!(entry["jsonPayload"]["fields.message"], "from the caller");
    }

    #[rstest]
    #[case::project("project_id")]
    #[case::log_name("log_name")]
    fn empty_required_settings_fail_construction(
        mut config: GcpSinkConfig,
        #[case] key: &str,
    ) {
        match key {
            "project_id" => config.project_id.clear(),
            _ => config.log_name.clear(),
        }
        let error = GcpSink::new(&config, reqwest::Client::new())
            .err()
            .expect("construction fails");
        assert_eq!(error, LoggerError::missing_setting("gcp", key));
    }

    #[rstest]
    fn invalid_endpoint_fails_construction(mut config: GcpSinkConfig) {
        config.endpoint = "not a url".to_owned();
        let error = GcpSink::new(&config, reqwest::Client::new())
            .err()
            .expect("construction fails");
        assert!(matches!(error, LoggerError::InvalidEndpoint { .. }));
    }

    #[rstest]
    fn missing_credentials_file_is_unreadable(config: GcpSinkConfig) {
        let error = GcpSink::new(&config, reqwest::Client::new())
            .err()
            .expect("construction fails");
        assert!(matches!(error, LoggerError::UnreadableCredentials { .. }));
    }

    #[rstest]
    fn malformed_credentials_are_invalid(mut config: GcpSinkConfig) {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"client_email":"svc@example.iam","private_key":"not a pem"}"#)
            .expect("write credentials");
        config.credentials_file = file.path().to_path_buf();
        let error = GcpSink::new(&config, reqwest::Client::new())
            .err()
            .expect("construction fails");
        assert!(matches!(error, LoggerError::InvalidCredentials { .. }));
    }
}
