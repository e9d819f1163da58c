//! Unit tests for the layer rules.

use std::path::PathBuf;

use rstest::rstest;

use super::*;

fn lint_one(file: &str, contents: &str) -> Result<(), ArchitectureLintError> {
    lint_sources(&[LintSource {
        file: PathBuf::from(file),
        contents: contents.to_owned(),
    }])
}

#[rstest]
#[case("inbound/http/member/controller.rs", "use crate::domain::MemberId;", true)]
#[case(
    "inbound/http/member/controller.rs",
    "use crate::outbound::persistence::DbPool;",
    false
)]
#[case(
    "inbound/http/member/controller.rs",
    "use member_service::outbound::persistence::DbPool;",
    false
)]
#[case("inbound/http/member/mapper.rs", "use diesel::prelude::*;", false)]
#[case("inbound/http/actix_adapter.rs", "use actix_web::HttpRequest;", true)]
#[case("middleware/recover.rs", "use crate::server::build_app;", false)]
#[case("middleware/trace.rs", "use crate::observability::TraceId;", true)]
#[case("domain/member.rs", "use crate::inbound::http::ErrorCode;", false)]
#[case("domain/member.rs", "use super::super::modules::Module;", false)]
#[case("domain/member_service.rs", "use crate::observability::RequestContext;", true)]
#[case("domain/member.rs", "fn f() -> actix_web::HttpResponse { todo!() }", false)]
#[case("domain/member.rs", "use pagination::Pagination;", true)]
#[case("outbound/persistence/diesel_member_dao.rs", "use crate::inbound::http;", false)]
#[case("outbound/persistence/member_gateway.rs", "use crate::middleware::Trace;", false)]
#[case("outbound/persistence/pool.rs", "use diesel_async::AsyncPgConnection;", true)]
#[case("outbound/persistence/pool.rs", "use actix_web::web;", false)]
fn layer_rules(#[case] file: &str, #[case] contents: &str, #[case] ok: bool) {
    let result = lint_one(file, contents);
    assert_eq!(result.is_ok(), ok, "result: {result:?}");
}

#[rstest]
fn files_outside_layers_are_rejected() {
    let err = lint_one("server/mod.rs", "fn main() {}").expect_err("no layer");
    assert!(matches!(err, ArchitectureLintError::Parse { .. }));
}

#[rstest]
fn every_violation_is_reported_once() {
    let err = lint_one(
        "domain/member.rs",
        "use crate::outbound::persistence::DbPool; use crate::outbound::persistence::DaoError;",
    )
    .expect_err("violations");
    let ArchitectureLintError::Violations(violations) = err else {
        panic!("expected violations, got {err:?}");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations.first().map(|v| v.message.as_str()),
        Some("domain must not depend on crate::outbound")
    );
}
