//! Panic recovery for request handlers.
//!
//! A panicking handler is logged with its location and backtrace and
//! answered with the `InternalServer` envelope. When the panic message shows
//! the client connection is already gone, only a bare 500 is produced.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpRequest, HttpResponse};
use futures_util::FutureExt as _;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use mockable::Clock;

use crate::inbound::http::{ErrorCode, failure_json};
use crate::observability::{Field, Logger, TraceId};

const BROKEN_CONNECTION_MARKERS: [&str; 2] = ["broken pipe", "connection reset"];

/// Where a panic happened, captured by the hook.
#[derive(Debug, Clone)]
pub struct PanicReport {
    /// `file:line:column`, when known.
    pub location: Option<String>,
    /// Rendered backtrace.
    pub backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

/// Install a process-wide hook recording each panic's location and
/// backtrace for [`take_panic_report`]. Panics outside request handling are
/// also reported through `tracing`.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info: &PanicHookInfo<'_>| {
        let report = PanicReport {
            location: info
                .location()
                .map(|at| format!("{}:{}:{}", at.file(), at.line(), at.column())),
            backtrace: Backtrace::force_capture().to_string(),
        };
        tracing::debug!(location = ?report.location, "panic captured");
        LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
    }));
}

/// The report of the last panic on this thread, if the hook recorded one.
#[must_use]
pub fn take_panic_report() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Whether a panic message means the peer hung up.
#[must_use]
pub fn is_broken_connection(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    BROKEN_CONNECTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Recovery middleware factory.
#[derive(Clone)]
pub struct Recover {
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
}

impl Recover {
    /// Log through `logger`; stamp envelopes with `clock`.
    pub fn new(logger: Arc<dyn Logger>, clock: Arc<dyn Clock>) -> Self {
        Self { logger, clock }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Recover
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoverMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RecoverMiddleware {
            service,
            recover: self.clone(),
        }))
    }
}

/// Service produced by [`Recover`].
pub struct RecoverMiddleware<S> {
    service: S,
    recover: Recover,
}

impl Recover {
    fn respond<B>(
        &self,
        request: HttpRequest,
        payload: &(dyn Any + Send),
    ) -> ServiceResponse<EitherBody<B>> {
        let message = panic_message(payload);
        let report = take_panic_report();
        let mut fields = vec![
            Field::new("method", request.method().as_str()),
            Field::new("path", request.path()),
            Field::new("panic", message.as_str()),
        ];
        if let Some(trace_id) = TraceId::current() {
            fields.push(Field::new("trace_id", trace_id.to_string()));
        }
        if let Some(report) = report {
            fields.push(Field::new("location", report.location.unwrap_or_default()));
            fields.push(Field::new("stack", report.backtrace));
        }

        let response = if is_broken_connection(&message) {
            self.logger
                .warn("client connection lost while handling request", &fields);
            HttpResponse::InternalServerError().finish()
        } else {
            self.logger.error("request handler panicked", &fields);
            HttpResponse::InternalServerError()
                .json(failure_json(self.clock.utc(), ErrorCode::InternalServer))
        };
        ServiceResponse::new(request, response).map_into_right_body()
    }
}

impl<S, B> Service<ServiceRequest> for RecoverMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request = req.request().clone();
        let recover = self.recover.clone();
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => {
                let response = recover.respond(request, payload.as_ref());
                return Box::pin(async move { Ok(response) });
            }
        };
        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map(ServiceResponse::map_into_left_body),
                Err(payload) => Ok(recover.respond(request, payload.as_ref())),
            }
        })
    }
}
