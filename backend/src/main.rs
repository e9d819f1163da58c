//! Member service entry-point: loads configuration, connects storage and
//! serves the member API until interrupted.

use std::sync::Arc;

use actix_web::web;
use clap::Parser;
use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use member_service::config::{AppConfig, Cli};
use member_service::inbound::http::HealthState;
use member_service::middleware::{RateLimit, RateLimitStore, Recover, install_panic_hook};
use member_service::modules::{MemberModule, Module, ModuleDeps};
use member_service::observability::{Field, Jwt, Logger, Tracer, build_logger};
use member_service::outbound::persistence::{DbPool, run_migrations};
use member_service::server::{AppDependencies, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
    install_panic_hook();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.source()).wrap_err("failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let logger: Arc<dyn Logger> = Arc::new(
        build_logger(&config.logger, Arc::clone(&clock)).wrap_err("failed to build logger")?,
    );
    let logger = logger.with(&[Field::new("env", config.env.as_str())]);
    let outcome = serve(&config, &logger, clock).await;
    if let Err(err) = &outcome {
        logger.error("startup failed", &[Field::new("error", format!("{err:#}"))]);
    }
    if let Err(err) = logger.sync().await {
        warn!(error = %err, "logger sync failed");
    }
    outcome
}

fn jwt_configured(config: &AppConfig) -> bool {
    !config.jwt.secret.is_empty()
        || config.jwt.rsa_private_key_file.is_some()
        || config.jwt.ec_private_key_file.is_some()
}

async fn serve(config: &AppConfig, logger: &Arc<dyn Logger>, clock: Arc<dyn Clock>) -> Result<()> {
    let tracer = Tracer::new(&config.tracer);
    if jwt_configured(config) {
        let jwt = Jwt::new(&config.jwt, Arc::clone(&clock)).wrap_err("invalid jwt configuration")?;
        logger.info(
            "jwt ready",
            &[Field::new("algorithm", jwt.signing_algorithm().as_str())],
        );
    }

    if config.database.run_migrations {
        let database = config.database.clone();
        let applied = tokio::task::spawn_blocking(move || run_migrations(&database))
            .await
            .wrap_err("migration task failed")?
            .wrap_err("failed to apply migrations")?;
        logger.info("migrations applied", &[Field::new("count", applied)]);
    }
    let pool = DbPool::connect(&config.database)
        .await
        .wrap_err("failed to connect to the database")?;

    let deps = ModuleDeps {
        logger: Arc::clone(logger),
        tracer,
        clock: Arc::clone(&clock),
    };
    let modules: Vec<Arc<dyn Module>> = vec![Arc::new(MemberModule::build(pool, &deps))];

    let store = Arc::new(RateLimitStore::from_config(&config.rate_limit));
    let janitor = config
        .rate_limit
        .enabled
        .then(|| RateLimitStore::spawn_janitor(&store));

    let health = web::Data::new(HealthState::new());
    let app_deps = AppDependencies {
        health: health.clone(),
        modules: modules.into(),
        request_timeout: config.server.http.request_timeout(),
        recover: Recover::new(Arc::clone(logger), Arc::clone(&clock)),
        rate_limit: RateLimit::new(store, clock),
        rate_limit_enabled: config.rate_limit.enabled,
    };
    let server = create_server(&config.server.http, app_deps, logger)
        .wrap_err("failed to start http server")?;

    let handle = server.handle();
    let drain_health = health.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            drain_health.mark_unhealthy();
            handle.stop(true).await;
        }
    });

    server.await.wrap_err("http server failed")?;
    health.mark_unhealthy();
    if let Some(janitor) = janitor {
        janitor.abort();
    }
    logger.info("shutdown complete", &[]);
    Ok(())
}
