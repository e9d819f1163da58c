//! Entities and errors to the wire envelope.
//!
//! Classification is pure; the presenter only reads its clock to stamp the
//! envelope.

use std::sync::Arc;

use mockable::Clock;
use pagination::{PageMeta, Pagination};
use serde::Serialize;
use serde_json::Value;

use super::error::RequestError;
use crate::domain::{Member, MemberPage, MemberUseCaseError};
use crate::inbound::http::envelope::Envelope;
use crate::inbound::http::error_code::ErrorCode;
use crate::inbound::http::transport::BindError;

/// Member as returned to clients; the password never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberResponse {
    /// Identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Creation instant, RFC 3339.
    pub created_at: String,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.get(),
            name: member.name.clone(),
            email: member.email.clone(),
            created_at: member
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

/// One page of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberListResponse {
    /// Members in window order.
    pub members: Vec<MemberResponse>,
}

/// Status and body ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Presented {
    /// HTTP status.
    pub status: u16,
    /// Envelope JSON.
    pub body: Value,
}

/// Code and client message for a failed request.
#[must_use]
pub fn classify(err: &RequestError) -> (ErrorCode, String) {
    match err {
        RequestError::Bind(bind) => {
            let code = match bind {
                BindError::JsonSyntax { .. } => ErrorCode::InvalidJsonSyntax,
                BindError::JsonType { .. } => ErrorCode::InvalidJsonType,
                BindError::MissingField { .. } => ErrorCode::MissingField,
                BindError::InvalidParams { .. } => ErrorCode::InvalidParams,
            };
            (code, code.message().to_owned())
        }
        RequestError::Validation(failure) => (ErrorCode::ValidationFailed, failure.to_string()),
        RequestError::UseCase(use_case) => {
            let code = use_case_code(use_case);
            (code, code.message().to_owned())
        }
    }
}

fn use_case_code(err: &MemberUseCaseError) -> ErrorCode {
    match err {
        MemberUseCaseError::NotFound { .. } => ErrorCode::MemberNotFound,
        MemberUseCaseError::AlreadyExists { .. } => ErrorCode::MemberAlreadyExists,
        MemberUseCaseError::EmailAlreadyExists => ErrorCode::MemberEmailAlreadyExists,
        MemberUseCaseError::UpdateSameEmail => ErrorCode::MemberUpdateSameEmail,
        MemberUseCaseError::UpdateSamePassword => ErrorCode::MemberUpdateSamePassword,
        MemberUseCaseError::PasswordIncorrect => ErrorCode::MemberPasswordIncorrect,
        MemberUseCaseError::NoEffect { .. } => ErrorCode::MemberNoEffect,
        MemberUseCaseError::UpdateFailed { .. } => ErrorCode::MemberUpdateFailed,
        MemberUseCaseError::DeleteFailed { .. } => ErrorCode::MemberDeleteFailed,
        MemberUseCaseError::Db { .. } if err.is_context_ended() => ErrorCode::ContextTimeout,
        MemberUseCaseError::Db { .. } => ErrorCode::MemberDbError,
        MemberUseCaseError::Unexpected { .. } => ErrorCode::MemberUnexpected,
    }
}

/// Builds member envelopes.
#[derive(Clone)]
pub struct MemberPresenter {
    clock: Arc<dyn Clock>,
}

impl MemberPresenter {
    /// Stamp envelopes with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// `200` with one member.
    #[must_use]
    pub fn member(&self, member: &Member) -> Presented {
        Presented {
            status: 200,
            body: Envelope::success(self.clock.utc(), MemberResponse::from(member)).to_json(),
        }
    }

    /// `200` with a page of members and its window metadata.
    #[must_use]
    pub fn list(&self, page: &MemberPage, window: &Pagination) -> Presented {
        let data = MemberListResponse {
            members: page.members.iter().map(MemberResponse::from).collect(),
        };
        let meta = PageMeta::new(window, page.total);
        Presented {
            status: 200,
            body: Envelope::success_with_meta(self.clock.utc(), data, meta).to_json(),
        }
    }

    /// Failure envelope with the status its code maps to.
    #[must_use]
    pub fn error(&self, err: &RequestError) -> Presented {
        let (code, message) = classify(err);
        Presented {
            status: code.http_status(),
            body: Envelope::<Value>::failure(self.clock.utc(), code, message).to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone as _, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::MemberId;
    use crate::domain::ports::{DbFailure, MemberGatewayError};
    use crate::inbound::http::member::validator::ValidationFailure;

    struct FixtureClock(DateTime<Utc>);

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<chrono::Local> {
            self.0.with_timezone(&chrono::Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("instant")
    }

    #[fixture]
    fn presenter() -> MemberPresenter {
        MemberPresenter::new(Arc::new(FixtureClock(instant())))
    }

    fn member() -> Member {
        Member {
            id: MemberId::new(1),
            name: "A".to_owned(),
            email: "a@x.io".to_owned(),
            password: "pw1234".to_owned(),
            created_at: instant(),
        }
    }

    #[rstest]
    fn member_reply_omits_the_password(presenter: MemberPresenter) {
        let presented = presenter.member(&member());

        assert_eq!(presented.status, 200);
        assert_eq!(presented.body["status"], "success");
        assert_eq!(presented.body["unix_timestamp"], 1_735_689_600);
        assert_eq!(presented.body["data"]["id"], 1);
        assert_eq!(presented.body["data"]["email"], "a@x.io");
        assert_eq!(presented.body["data"]["created_at"], "2025-01-01T00:00:00Z");
        assert!(presented.body["data"].get("password").is_none());
        assert!(presented.body.get("error").is_none());
    }

    #[rstest]
    fn list_reply_carries_members_and_meta(presenter: MemberPresenter) {
        let page = MemberPage {
            members: vec![member()],
            total: 3,
        };
        let window = Pagination::new(2, 1, Default::default(), Default::default())
            .expect("window");
        let presented = presenter.list(&page, &window);

        assert_eq!(presented.body["data"]["members"][0]["name"], "A");
        assert_eq!(presented.body["meta"]["total"], 3);
        assert_eq!(presented.body["meta"]["offset"], 1);
    }

    fn use_case(err: MemberUseCaseError) -> RequestError {
        RequestError::UseCase(err)
    }

    #[rstest]
    #[case(use_case(MemberUseCaseError::NotFound { source: MemberGatewayError::not_found() }), "3001", 404)]
    #[case(use_case(MemberUseCaseError::AlreadyExists { source: MemberGatewayError::already_exists() }), "3000", 409)]
    #[case(use_case(MemberUseCaseError::EmailAlreadyExists), "3006", 409)]
    #[case(use_case(MemberUseCaseError::UpdateSameEmail), "3003", 409)]
    #[case(use_case(MemberUseCaseError::UpdateSamePassword), "3004", 409)]
    #[case(use_case(MemberUseCaseError::PasswordIncorrect), "3005", 401)]
    #[case(use_case(MemberUseCaseError::NoEffect { source: MemberGatewayError::no_effect() }), "3002", 422)]
    #[case(use_case(MemberUseCaseError::UpdateFailed { source: MemberGatewayError::no_effect() }), "3007", 500)]
    #[case(use_case(MemberUseCaseError::DeleteFailed { source: MemberGatewayError::no_effect() }), "3008", 500)]
    #[case(use_case(MemberUseCaseError::Db { kind: DbFailure::Other, source: MemberGatewayError::db(DbFailure::Other) }), "3009", 500)]
    #[case(use_case(MemberUseCaseError::Db { kind: DbFailure::Timeout, source: MemberGatewayError::db(DbFailure::Timeout) }), "5002", 504)]
    #[case(use_case(MemberUseCaseError::Db { kind: DbFailure::Canceled, source: MemberGatewayError::db(DbFailure::Canceled) }), "5002", 504)]
    #[case(use_case(MemberUseCaseError::Unexpected { source: MemberGatewayError::mapping_failed("bad row") }), "3010", 500)]
    #[case(RequestError::Bind(BindError::invalid_params("id must be an integer")), "1002", 400)]
    #[case(RequestError::Bind(BindError::MissingField { message: "missing field `id`".to_owned() }), "2001", 400)]
    fn errors_map_to_codes_and_statuses(
        presenter: MemberPresenter,
        #[case] err: RequestError,
        #[case] code: &str,
        #[case] status: u16,
    ) {
        let presented = presenter.error(&err);

        assert_eq!(presented.status, status);
        assert_eq!(presented.body["status"], "failed");
        assert_eq!(presented.body["error"]["code"], code);
        assert!(presented.body.get("data").is_none());
    }

    #[rstest]
    fn json_errors_split_syntax_from_type(presenter: MemberPresenter) {
        let syntax = serde_json::from_str::<Value>("{").expect_err("syntax");
        let shape = serde_json::from_str::<Vec<u8>>("\"text\"").expect_err("type");

        let syntax_reply = presenter.error(&RequestError::Bind(BindError::JsonSyntax { source: syntax }));
        let type_reply = presenter.error(&RequestError::Bind(BindError::JsonType { source: shape }));

        assert_eq!(syntax_reply.body["error"]["code"], "1000");
        assert_eq!(type_reply.body["error"]["code"], "1001");
    }

    #[rstest]
    fn validation_message_names_field_and_rule(presenter: MemberPresenter) {
        let failure = ValidationFailure {
            field: "password",
            rule: "min".to_owned(),
        };
        let presented = presenter.error(&RequestError::Validation(failure));

        assert_eq!(presented.status, 400);
        assert_eq!(presented.body["error"]["code"], "2000");
        assert_eq!(
            presented.body["error"]["message"],
            "field 'password' failed rule min"
        );
    }

    #[rstest]
    fn raw_database_text_is_never_returned(presenter: MemberPresenter) {
        let source = MemberGatewayError::db(DbFailure::Other)
            .caused_by("relation \"members\" does not exist");
        let presented = presenter.error(&use_case(MemberUseCaseError::Db {
            kind: DbFailure::Other,
            source,
        }));

        let body = presented.body.to_string();
        assert!(!body.contains("relation"));
    }
}
