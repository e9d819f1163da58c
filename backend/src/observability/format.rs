//! Record rendering for local streams.

use std::str::FromStr;

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use super::error::LoggerError;
use super::logger::LogRecord;

/// Rendering chosen when a local-stream sink is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `timestamp LEVEL message key=value ...`
    Text,
    /// One JSON object per line.
    #[default]
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "console" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(LoggerError::unsupported_format(other)),
        }
    }
}

impl LogFormat {
    /// Render `record` as a single line without the trailing newline.
    #[must_use]
    pub fn render(self, record: &LogRecord) -> String {
        match self {
            Self::Text => render_text(record),
            Self::Json => render_json(record),
        }
    }
}

fn render_text(record: &LogRecord) -> String {
    let mut line = format!(
        "{} {:<5} {}",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.level.as_str().to_ascii_uppercase(),
        record.message,
    );
    for field in &record.fields {
        let rendered = match field.value() {
            Value::String(text) if !text.contains(char::is_whitespace) => text.clone(),
            other => other.to_string(),
        };
        line.push(' ');
        line.push_str(field.key());
        line.push('=');
        line.push_str(&rendered);
    }
    line
}

const RESERVED_KEYS: [&str; 3] = ["timestamp", "level", "message"];

/// Fields are written first; a field named after a reserved key is kept as
/// `fields.<key>` so the record's own values always win.
fn render_json(record: &LogRecord) -> String {
    let mut object = Map::new();
    for field in &record.fields {
        let key = if RESERVED_KEYS.contains(&field.key()) {
            format!("fields.{}", field.key())
        } else {
            field.key().to_owned()
        };
        object.insert(key, field.value().clone());
    }
    object.insert(
        "timestamp".to_owned(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    object.insert(
        "level".to_owned(),
        Value::String(record.level.as_str().to_owned()),
    );
    object.insert("message".to_owned(), Value::String(record.message.clone()));
    Value::Object(object).to_string()
}
