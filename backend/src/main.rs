//! LifeLine entry point: loads settings, prepares storage and serves the API.

mod server;

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lifeline::TraceId;
use lifeline::domain::ports::BloodRequestCommand;
use lifeline::inbound::http::health::HealthState;
use lifeline::inbound::http::session_config::{BuildMode, session_settings_from_env};
use lifeline::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};

use server::{AppServices, ServerConfig, ServerSettings, build_services, create_server};

#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load()?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::current())?;
    let pool = connect_database(&settings).await?;
    let AppServices {
        http_state,
        sweeper,
        storage,
    } = build_services(&settings, pool);

    let health_state = web::Data::new(HealthState::new(storage));
    let bind_addr = settings.bind_addr()?;
    let server = create_server(
        health_state.clone(),
        ServerConfig {
            bind_addr,
            session,
            http_state,
            #[cfg(feature = "metrics")]
            prometheus: server::prometheus_metrics(),
        },
    )?;
    let handle = server.handle();
    let sweep = actix_web::rt::spawn(run_expiry_sweep(
        sweeper,
        settings.expiry_sweep_interval(),
    ));

    info!(%bind_addr, ?storage, "lifeline listening");
    health_state.mark_ready();
    let shutdown_health = health_state.clone();
    actix_web::rt::spawn(async move {
        if actix_web::rt::signal::ctrl_c().await.is_ok() {
            shutdown_health.mark_draining();
            handle.stop(true).await;
        }
    });

    server.await?;
    sweep.abort();
    Ok(())
}

/// Connect and migrate when a database URL is configured.
async fn connect_database(settings: &ServerSettings) -> color_eyre::Result<Option<DbPool>> {
    let Some(url) = settings.database_url() else {
        warn!("LIFELINE_DATABASE_URL not set; data is kept in memory");
        return Ok(None);
    };
    let config = PoolConfig::new(url);
    info!(database = %config.redacted_url(), "connecting to database");
    let applied = run_pending_migrations(url).await?;
    info!(applied, "database schema up to date");
    Ok(Some(DbPool::new(config).await?))
}

/// Periodically expire active requests whose deadline has passed.
///
/// Each pass runs under its own trace id so its log lines correlate.
async fn run_expiry_sweep(sweeper: Arc<dyn BloodRequestCommand>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let trace_id = TraceId::generate();
        TraceId::scope(trace_id, async {
            match sweeper.expire_overdue().await {
                Ok(0) => {}
                Ok(expired) => info!(%trace_id, expired, "expired overdue requests"),
                Err(err) => error!(%trace_id, error = %err.message(), "expiry sweep failed"),
            }
        })
        .await;
    }
}
