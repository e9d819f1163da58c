//! Middleware scoping a trace identifier to each request.
//!
//! The identifier lives in task-local storage for the whole request, so the
//! tracer and every logger enriched from a request context pick it up, and
//! it is echoed in a `trace-id` response header. A valid incoming
//! `trace-id` header is adopted instead of generating one.

use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::observability::TraceId;

/// Response and request header carrying the trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

fn incoming(req: &ServiceRequest) -> Option<TraceId> {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<TraceId>().ok())
        .filter(TraceId::is_valid)
}

/// Trace middleware factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = incoming(&req).unwrap_or_else(TraceId::generate);
        let fut = TraceId::scope(trace_id, self.service.call(req));
        Box::pin(async move {
            let mut res = fut.await?;
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(err) => {
                    error!(error = %err, %trace_id, "trace identifier is not a valid header value");
                }
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use super::*;

    async fn echo_trace_id() -> HttpResponse {
        match TraceId::current() {
            Some(id) => HttpResponse::Ok().body(id.to_string()),
            None => HttpResponse::InternalServerError().finish(),
        }
    }

    async fn call(req: test::TestRequest) -> (String, String) {
        let app = test::init_service(
            App::new()
                .wrap(Trace)
                .route("/", web::get().to(echo_trace_id)),
        )
        .await;
        let res = test::call_service(&app, req.uri("/").to_request()).await;
        let header = res
            .headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("ascii header")
            .to_owned();
        let body = test::read_body(res).await;
        (header, String::from_utf8(body.to_vec()).expect("utf8 body"))
    }

    #[rstest]
    #[actix_web::test]
    async fn handler_sees_the_header_trace_id() {
        let (header, body) = call(test::TestRequest::get()).await;

        assert_eq!(header, body);
        assert_eq!(header.len(), 32);
        assert!(header.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[rstest]
    #[actix_web::test]
    async fn valid_incoming_trace_id_is_adopted() {
        let supplied = "4bf92f3577b34da6a3ce929d0e0e4736";
        let (header, body) =
            call(test::TestRequest::get().insert_header((TRACE_ID_HEADER, supplied))).await;

        assert_eq!(header, supplied);
        assert_eq!(body, supplied);
    }

    #[rstest]
    #[case("not-a-trace-id")]
    #[case("00000000000000000000000000000000")]
    #[actix_web::test]
    async fn unusable_incoming_trace_id_is_replaced(#[case] supplied: &str) {
        let (header, _) =
            call(test::TestRequest::get().insert_header((TRACE_ID_HEADER, supplied))).await;

        assert_ne!(header, supplied);
        assert_eq!(header.len(), 32);
    }
}
