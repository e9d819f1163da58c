//! Server construction and middleware wiring.

mod config;

pub use config::{HttpConfig, ServerConfig};

use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::Condition;
use actix_web::{App, HttpServer, web};

use crate::inbound::http::ActixRouter;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::middleware::{RateLimit, Recover, Trace};
use crate::modules::Module;
use crate::observability::{Field, Logger};

/// Everything a worker needs to build its [`App`].
#[derive(Clone)]
pub struct AppDependencies {
    /// Shared probe state.
    pub health: web::Data<HealthState>,
    /// Mounted feature modules, in registration order.
    pub modules: Arc<[Arc<dyn Module>]>,
    /// Deadline applied to every module request.
    pub request_timeout: Duration,
    /// Panic recovery.
    pub recover: Recover,
    /// Request limiter, mounted only when `rate_limit_enabled`.
    pub rate_limit: RateLimit,
    /// Whether the limiter runs.
    pub rate_limit_enabled: bool,
}

/// Build the application: probes, every module group and the middleware
/// stack. [`Trace`] is outermost so recovered panics still carry an id.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health,
        modules,
        request_timeout,
        recover,
        rate_limit,
        rate_limit_enabled,
    } = deps;

    App::new()
        .app_data(health)
        .wrap(Condition::new(rate_limit_enabled, rate_limit))
        .wrap(recover)
        .wrap(Trace)
        .service(ready)
        .service(live)
        .configure(move |cfg| {
            for module in modules.iter() {
                let mut router = ActixRouter::group(module.prefix(), request_timeout);
                module.register(&mut router);
                router.configure(cfg);
            }
        })
}

/// Bind the listener and start serving; readiness flips once bound.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when the address is invalid or binding
/// fails.
pub fn create_server(
    config: &HttpConfig,
    deps: AppDependencies,
    logger: &Arc<dyn Logger>,
) -> std::io::Result<Server> {
    let addr = config
        .bind_addr()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    for module in deps.modules.iter() {
        logger.info(
            "module mounted",
            &[
                Field::new("module", module.name()),
                Field::new("prefix", module.prefix()),
            ],
        );
    }
    let health = deps.health.clone();
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(addr)?
        .run();

    health.mark_ready();
    logger.info("listening", &[Field::new("addr", addr.to_string())]);
    Ok(server)
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use mockable::DefaultClock;
    use rstest::rstest;

    use super::*;
    use crate::middleware::RateLimitStore;
    use crate::observability::NopLogger;

    fn deps(modules: Vec<Arc<dyn Module>>) -> AppDependencies {
        let clock = Arc::new(DefaultClock);
        AppDependencies {
            health: web::Data::new(HealthState::new()),
            modules: modules.into(),
            request_timeout: Duration::from_secs(5),
            recover: Recover::new(Arc::new(NopLogger), clock.clone()),
            rate_limit: RateLimit::new(
                Arc::new(RateLimitStore::new(1, Duration::from_secs(60))),
                clock,
            ),
            rate_limit_enabled: false,
        }
    }

    #[rstest]
    #[actix_web::test]
    async fn probes_are_mounted_outside_module_groups() {
        let deps = deps(Vec::new());
        deps.health.mark_ready();
        let app = actix_test::init_service(build_app(deps)).await;

        let ready_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/health/ready").to_request(),
        )
        .await;
        assert_eq!(ready_res.status(), StatusCode::OK);
        assert!(ready_res.headers().contains_key(crate::middleware::TRACE_ID_HEADER));

        let missing = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/members").to_request(),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[actix_web::test]
    async fn disabled_limiter_lets_requests_through() {
        let app = actix_test::init_service(build_app(deps(Vec::new()))).await;
        for _ in 0..3 {
            let response = actix_test::call_service(
                &app,
                actix_test::TestRequest::get().uri("/health/live").to_request(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
