//! Tests for file loading and environment overrides.

use super::*;
use std::io::Write;

use env_lock::lock_env;
use rstest::rstest;
use tempfile::NamedTempFile;

const OVERRIDE_VARS: &[&str] = &[
    "APP_ENV",
    "SERVER_HTTP_HOST",
    "SERVER_HTTP_PORT",
    "SERVER_HTTP_REQUEST_TIMEOUT_MS",
    "DATABASE_DSN",
    "DATABASE_MAX_CONNECTIONS",
    "DATABASE_CONNECT_TIMEOUT_MS",
    "DATABASE_RUN_MIGRATIONS",
    "LOGGER_CONSOLE_ENABLED",
    "LOGGER_CONSOLE_LEVEL",
    "LOGGER_CONSOLE_FORMAT",
    "LOGGER_CONSOLE_STREAM",
    "LOGGER_GCP_ENABLED",
    "LOGGER_GCP_LEVEL",
    "LOGGER_GCP_PROJECT_ID",
    "LOGGER_GCP_LOG_NAME",
    "LOGGER_GCP_CREDENTIALS_FILE",
    "LOGGER_GCP_ENDPOINT",
    "LOGGER_SEQ_ENABLED",
    "LOGGER_SEQ_LEVEL",
    "LOGGER_SEQ_ENDPOINT",
    "LOGGER_SEQ_API_KEY",
    "LOGGER_SEQ_LOCAL_ECHO",
    "TRACER_ENABLED",
    "TRACER_SERVICE_NAME",
    "JWT_SECRET",
    "JWT_ISSUER",
    "JWT_AUDIENCE",
    "RATE_LIMIT_ENABLED",
    "RATE_LIMIT_REQUESTS",
    "RATE_LIMIT_WINDOW_MS",
];

/// Clear every override, then set `vars`.
fn env_with(vars: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
    OVERRIDE_VARS
        .iter()
        .map(|name| {
            let value = vars
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| (*value).to_owned());
            (*name, value)
        })
        .collect()
}

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write yaml");
    file
}

fn required(path: &Path) -> ConfigSource {
    ConfigSource {
        path: path.to_path_buf(),
        required: true,
    }
}

#[rstest]
fn missing_default_file_yields_defaults() {
    let _guard = lock_env(env_with(&[]));
    let source = ConfigSource {
        path: PathBuf::from("definitely-not-here.yaml"),
        required: false,
    };
    let config = AppConfig::load(&source).expect("defaults load");
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.env, "development");
    assert_eq!(config.server.http.port, 8080);
}

#[rstest]
fn missing_explicit_file_is_an_error() {
    let _guard = lock_env(env_with(&[]));
    let err = AppConfig::load(&required(Path::new("definitely-not-here.yaml")))
        .expect_err("explicit path must exist");
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[rstest]
fn yaml_sections_are_read() {
    let _guard = lock_env(env_with(&[]));
    let file = yaml_file(
        "env: staging\n\
         server:\n  http:\n    host: 127.0.0.1\n    port: 9090\n\
         database:\n  dsn: postgres://db/members\n  max_connections: 4\n\
         logger:\n  console:\n    level: warn\n    format: json\n\
         rate_limit:\n  enabled: true\n  requests: 5\n",
    );
    let config = AppConfig::load(&required(file.path())).expect("config loads");
    assert_eq!(config.env, "staging");
    assert_eq!(config.server.http.host, "127.0.0.1");
    assert_eq!(config.server.http.port, 9090);
    assert_eq!(config.database.dsn, "postgres://db/members");
    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.logger.console.level, Level::Warn);
    assert_eq!(config.logger.console.format, "json");
    assert!(config.rate_limit.enabled);
    assert_eq!(config.rate_limit.requests, 5);
    assert_eq!(config.tracer, TracerConfig::default());
}

#[rstest]
fn empty_file_yields_defaults() {
    let _guard = lock_env(env_with(&[]));
    let file = yaml_file("   \n");
    let config = AppConfig::load(&required(file.path())).expect("config loads");
    assert_eq!(config, AppConfig::default());
}

#[rstest]
fn invalid_yaml_is_a_parse_error() {
    let _guard = lock_env(env_with(&[]));
    let file = yaml_file("server: [unclosed\n");
    let err = AppConfig::load(&required(file.path())).expect_err("parse error");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[rstest]
fn environment_overrides_the_file() {
    let _guard = lock_env(env_with(&[
        ("APP_ENV", "production"),
        ("SERVER_HTTP_PORT", "7070"),
        ("DATABASE_DSN", "postgres://env/members"),
        ("LOGGER_SEQ_ENABLED", "true"),
        ("LOGGER_SEQ_API_KEY", "seq-key"),
        ("LOGGER_CONSOLE_LEVEL", "ERROR"),
        ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ("RATE_LIMIT_REQUESTS", "42"),
    ]));
    let file = yaml_file("env: staging\nserver:\n  http:\n    port: 9090\n");
    let config = AppConfig::load(&required(file.path())).expect("config loads");
    assert_eq!(config.env, "production");
    assert_eq!(config.server.http.port, 7070);
    assert_eq!(config.database.dsn, "postgres://env/members");
    assert!(config.logger.seq.enabled);
    assert_eq!(config.logger.seq.api_key.as_deref(), Some("seq-key"));
    assert_eq!(config.logger.console.level, Level::Error);
    assert_eq!(config.jwt.secret, "0123456789abcdef0123456789abcdef");
    assert_eq!(config.rate_limit.requests, 42);
}

#[rstest]
fn unparsable_override_names_the_section() {
    let _guard = lock_env(env_with(&[("SERVER_HTTP_PORT", "not-a-port")]));
    let mut config = AppConfig::default();
    let err = config.apply_env_overrides().expect_err("port must be numeric");
    assert!(matches!(
        err,
        ConfigError::Environment { ref section, .. } if section == "server.http"
    ));
}

#[rstest]
#[case(None, DEFAULT_CONFIG_PATH, false)]
#[case(Some("custom.yaml"), "custom.yaml", true)]
fn cli_selects_the_config_source(
    #[case] flag: Option<&str>,
    #[case] expected: &str,
    #[case] required: bool,
) {
    let _guard = lock_env([("APP_CONFIG_PATH", None::<String>)]);
    let mut args = vec!["member-service".to_owned()];
    if let Some(path) = flag {
        args.push("--config".to_owned());
        args.push(path.to_owned());
    }
    let cli = Cli::try_parse_from(args).expect("arguments parse");
    let source = cli.source();
    assert_eq!(source.path, PathBuf::from(expected));
    assert_eq!(source.required, required);
}

#[rstest]
fn cli_reads_the_path_from_the_environment() {
    let _guard = lock_env([("APP_CONFIG_PATH", Some("from-env.yaml".to_owned()))]);
    let cli = Cli::try_parse_from(["member-service"]).expect("arguments parse");
    assert_eq!(cli.source().path, PathBuf::from("from-env.yaml"));
}
