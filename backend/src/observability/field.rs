//! Structured log fields and sensitive-key redaction.

use std::collections::HashSet;
use std::error::Error as StdError;

use serde::Serialize;
use serde_json::{Map, Value};

/// Replacement written in place of any sensitive value.
pub const REDACTED: &str = "******";

/// A single structured `(key, value)` pair attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: Value,
}

impl Field {
    /// Build a field from anything convertible into a JSON value.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a field by serialising `value`.
    ///
    /// Serialisation failures are recorded in the field itself rather than
    /// dropping it.
    pub fn serialized<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|err| Value::String(format!("<unserialisable: {err}>")));
        Self::new(key, value)
    }

    /// Attach an error under `error`, rendering its whole source chain.
    pub fn error(error: &(dyn StdError + 'static)) -> Self {
        Self::new("error", error_chain(error))
    }

    /// Field key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

/// Render `error` followed by each of its sources, separated by `: `.
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Replaces the values of configured keys with [`REDACTED`].
///
/// Matching is case-insensitive and recurses through nested objects and
/// arrays.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    keys: HashSet<String>,
}

impl Redactor {
    /// Build a redactor for the given key names.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|key| key.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `key` is sensitive.
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.keys.contains(&key.to_ascii_lowercase())
    }

    /// Return a copy of `fields` with sensitive values replaced.
    #[must_use]
    pub fn redact(&self, fields: &[Field]) -> Vec<Field> {
        fields
            .iter()
            .map(|field| Field {
                key: field.key.clone(),
                value: self.redact_entry(&field.key, &field.value),
            })
            .collect()
    }

    fn redact_entry(&self, key: &str, value: &Value) -> Value {
        if self.is_sensitive(key) {
            Value::String(REDACTED.to_owned())
        } else {
            self.redact_value(value)
        }
    }

    fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, nested)| (key.clone(), self.redact_entry(key, nested)))
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.redact_value(item)).collect())
            }
            other => other.clone(),
        }
    }
}
