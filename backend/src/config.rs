//! Application configuration.
//!
//! A YAML file provides the nested [`AppConfig`]; each section can then be
//! overridden from the environment through a flat `OrthoConfig` record
//! whose prefix is the section path, e.g. `SERVER_HTTP_PORT` or
//! `LOGGER_SEQ_API_KEY`. An environment value always wins over the file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::macros::define_error;
use crate::middleware::RateLimitConfig;
use crate::observability::{JwtConfig, Level, LoggerConfig, TracerConfig};
use crate::outbound::persistence::DatabaseConfig;
use crate::server::ServerConfig;

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const PROGRAM: &str = "member-service";

macro_rules! overrides {
    ($record:ty, $section:literal) => {
        <$record>::load_from_iter([OsString::from(PROGRAM)])
            .map_err(|err| ConfigError::environment($section, err.to_string()))?
    };
}

define_error! {
    /// Configuration loading failures.
    pub enum ConfigError {
        /// The file could not be read.
        Read { path: String, message: String } => "failed to read {path}: {message}",
        /// The file is not valid YAML for [`AppConfig`].
        Parse { path: String, message: String } => "failed to parse {path}: {message}",
        /// An environment override could not be loaded.
        Environment { section: String, message: String } => "invalid {section} environment override: {message}",
    }
}

/// Command-line surface of the binary.
#[derive(Debug, Clone, Parser)]
#[command(name = PROGRAM, about = "Member CRUD HTTP API")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long = "config", env = "APP_CONFIG_PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Where to read configuration from. An explicit path must exist; the
    /// default one may be absent.
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.config.clone().map_or_else(
            || ConfigSource {
                path: PathBuf::from(DEFAULT_CONFIG_PATH),
                required: false,
            },
            |path| ConfigSource {
                path,
                required: true,
            },
        )
    }
}

/// A config file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    /// File path.
    pub path: PathBuf,
    /// Fail when the file is missing.
    pub required: bool,
}

fn default_env() -> String {
    "development".to_owned()
}

/// Every recognised option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Free-form deployment tag.
    #[serde(default = "default_env")]
    pub env: String,
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Log sinks.
    #[serde(default)]
    pub logger: LoggerConfig,
    /// Span recording.
    #[serde(default)]
    pub tracer: TracerConfig,
    /// Token signing.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// Request limiter.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logger: LoggerConfig::default(),
            tracer: TracerConfig::default(),
            jwt: JwtConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `source`, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] for an unreadable (or missing required) file,
    /// [`ConfigError::Parse`] for invalid YAML and [`ConfigError::Environment`]
    /// for an unparsable environment value.
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(source)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn from_file(source: &ConfigSource) -> Result<Self, ConfigError> {
        let path = source.path.display().to_string();
        match std::fs::read_to_string(&source.path) {
            Ok(raw) => Self::from_yaml(&raw, &source.path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !source.required => {
                tracing::info!(%path, "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::read(path, err.to_string())),
        }
    }

    /// Parse YAML text; an empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for invalid YAML.
    pub fn from_yaml(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|err| ConfigError::parse(origin.display().to_string(), err.to_string()))
    }

    /// Replace every value set in the environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Environment`] naming the first section that failed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let app = overrides!(AppOverrides, "app");
        replace(&mut self.env, app.env);

        let http = overrides!(HttpOverrides, "server.http");
        let listener = &mut self.server.http;
        replace(&mut listener.host, http.host);
        replace(&mut listener.port, http.port);
        replace(&mut listener.request_timeout_ms, http.request_timeout_ms);

        let database = overrides!(DatabaseOverrides, "database");
        replace(&mut self.database.dsn, database.dsn);
        replace(&mut self.database.max_connections, database.max_connections);
        replace(&mut self.database.connect_timeout_ms, database.connect_timeout_ms);
        replace(&mut self.database.run_migrations, database.run_migrations);

        let console = overrides!(ConsoleOverrides, "logger.console");
        let sink = &mut self.logger.console;
        replace(&mut sink.enabled, console.enabled);
        replace(&mut sink.level, console.level.as_deref().map(Level::parse_lenient));
        replace(&mut sink.format, console.format);
        replace(&mut sink.stream, console.stream);

        let gcp = overrides!(GcpOverrides, "logger.gcp");
        let sink = &mut self.logger.gcp;
        replace(&mut sink.enabled, gcp.enabled);
        replace(&mut sink.level, gcp.level.as_deref().map(Level::parse_lenient));
        replace(&mut sink.project_id, gcp.project_id);
        replace(&mut sink.log_name, gcp.log_name);
        replace(&mut sink.credentials_file, gcp.credentials_file);
        replace(&mut sink.endpoint, gcp.endpoint);

        let seq = overrides!(SeqOverrides, "logger.seq");
        let sink = &mut self.logger.seq;
        replace(&mut sink.enabled, seq.enabled);
        replace(&mut sink.level, seq.level.as_deref().map(Level::parse_lenient));
        replace(&mut sink.endpoint, seq.endpoint);
        if seq.api_key.is_some() {
            sink.api_key = seq.api_key;
        }
        replace(&mut sink.local_echo, seq.local_echo);

        let tracer = overrides!(TracerOverrides, "tracer");
        replace(&mut self.tracer.enabled, tracer.enabled);
        replace(&mut self.tracer.service_name, tracer.service_name);

        let jwt = overrides!(JwtOverrides, "jwt");
        replace(&mut self.jwt.secret, jwt.secret);
        replace(&mut self.jwt.issuer, jwt.issuer);
        if jwt.audience.is_some() {
            self.jwt.audience = jwt.audience;
        }

        let limit = overrides!(RateLimitOverrides, "rate_limit");
        replace(&mut self.rate_limit.enabled, limit.enabled);
        replace(&mut self.rate_limit.requests, limit.requests);
        replace(&mut self.rate_limit.window_ms, limit.window_ms);
        Ok(())
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}


/// `APP_ENV`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "APP")]
struct AppOverrides {
    env: Option<String>,
}

/// `SERVER_HTTP_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SERVER_HTTP")]
struct HttpOverrides {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_ms: Option<u64>,
}

/// `DATABASE_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DATABASE")]
struct DatabaseOverrides {
    dsn: Option<String>,
    max_connections: Option<u32>,
    connect_timeout_ms: Option<u64>,
    run_migrations: Option<bool>,
}

/// `LOGGER_CONSOLE_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOGGER_CONSOLE")]
struct ConsoleOverrides {
    enabled: Option<bool>,
    level: Option<String>,
    format: Option<String>,
    stream: Option<String>,
}

/// `LOGGER_GCP_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOGGER_GCP")]
struct GcpOverrides {
    enabled: Option<bool>,
    level: Option<String>,
    project_id: Option<String>,
    log_name: Option<String>,
    credentials_file: Option<String>,
    endpoint: Option<String>,
}

/// `LOGGER_SEQ_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOGGER_SEQ")]
struct SeqOverrides {
    enabled: Option<bool>,
    level: Option<String>,
    endpoint: Option<String>,
    api_key: Option<String>,
    local_echo: Option<bool>,
}

/// `TRACER_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRACER")]
struct TracerOverrides {
    enabled: Option<bool>,
    service_name: Option<String>,
}

/// `JWT_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "JWT")]
struct JwtOverrides {
    secret: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
}

/// `RATE_LIMIT_*`
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RATE_LIMIT")]
struct RateLimitOverrides {
    enabled: Option<bool>,
    requests: Option<u32>,
    window_ms: Option<u64>,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
