//! The uniform response envelope.
//!
//! Exactly one of `data` and `error` is set and `status` says which; the
//! constructors are the only way to build one.

use chrono::{DateTime, SecondsFormat, Utc};
use pagination::PageMeta;
use serde::Serialize;
use serde_json::{Value, json};

use super::error_code::ErrorCode;

/// Outcome marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// `data` is set.
    Success,
    /// `error` is set.
    Failed,
}

/// Failure payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Decimal error code.
    pub code: String,
    /// Short human-readable message.
    pub message: String,
}

/// Response envelope generic over the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    unix_timestamp: i64,
    rfc3339_timestamp: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
}

impl<T> Envelope<T> {
    fn stamped(now: DateTime<Utc>, status: Status) -> Self {
        Self {
            unix_timestamp: now.timestamp(),
            rfc3339_timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            data: None,
            error: None,
            meta: None,
        }
    }

    /// Successful reply carrying `data`.
    pub fn success(now: DateTime<Utc>, data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::stamped(now, Status::Success)
        }
    }

    /// Successful list reply carrying `data` and window metadata.
    pub fn success_with_meta(now: DateTime<Utc>, data: T, meta: PageMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(now, data)
        }
    }

    /// Failed reply for `code` with `message`.
    pub fn failure(now: DateTime<Utc>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
            ..Self::stamped(now, Status::Failed)
        }
    }

    /// Outcome marker.
    pub const fn status(&self) -> Status {
        self.status
    }
}

impl<T: Serialize> Envelope<T> {
    /// JSON form. Falls back to an internal-error envelope if `T` refuses to
    /// serialize.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|err| {
            tracing::error!(error = %err, "response envelope failed to serialize");
            json!({
                "unix_timestamp": self.unix_timestamp,
                "rfc3339_timestamp": self.rfc3339_timestamp,
                "status": Status::Failed,
                "error": {
                    "code": ErrorCode::InternalServer.to_string(),
                    "message": ErrorCode::InternalServer.message(),
                },
            })
        })
    }
}

/// Failure envelope JSON for `code` with its registered message.
#[must_use]
pub fn failure_json(now: DateTime<Utc>, code: ErrorCode) -> Value {
    Envelope::<Value>::failure(now, code, code.message()).to_json()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("instant")
    }

    #[rstest]
    fn success_sets_data_only() {
        let body = Envelope::success(now(), json!({"id": 1})).to_json();

        assert_eq!(body["status"], "success");
        assert_eq!(body["unix_timestamp"], 1_735_689_600);
        assert_eq!(body["rfc3339_timestamp"], "2025-01-01T00:00:00Z");
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("error").is_none());
        assert!(body.get("meta").is_none());
    }

    #[rstest]
    fn failure_sets_error_only() {
        let body = failure_json(now(), ErrorCode::MemberNotFound);

        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"]["code"], "3001");
        assert_eq!(body["error"]["message"], "member not found");
        assert!(body.get("data").is_none());
    }

    #[rstest]
    fn list_replies_carry_meta() {
        let window = pagination::Pagination::default();
        let body = Envelope::success_with_meta(
            now(),
            json!({"members": []}),
            PageMeta::new(&window, 3),
        )
        .to_json();

        assert_eq!(
            body["meta"],
            json!({"total": 3, "page": 1, "limit": 10, "offset": 0})
        );
    }
}
