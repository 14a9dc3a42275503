//! Teamforge composition root
//!
//! Wires configuration, logging and the PostgreSQL store into a
//! [`FormationEngine`], and hosts the request expiry sweep loop.

use std::future::Future;
use std::time::Duration;

use teamforge_common::Config;
use teamforge_formation::{EntityStore, FormationConfig, FormationEngine, PgStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Log filter from `RUST_LOG`, falling back to `info` when it does not parse
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber (`LOG_FORMAT=json` or pretty)
pub fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));
    if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

/// Connect to PostgreSQL, apply migrations and build the engine
pub async fn build_engine(config: &Config) -> anyhow::Result<FormationEngine<PgStore>> {
    let store = PgStore::connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
    info!("Database connection established");

    store
        .migrate()
        .await
        .map_err(|e| anyhow::anyhow!("Database migration failed: {}", e))?;
    info!("Database migrations applied");

    Ok(FormationEngine::new(store, FormationConfig::from(config)))
}

/// Age after which a pending request is expired
pub fn request_max_age(config: &Config) -> anyhow::Result<chrono::Duration> {
    chrono::Duration::try_days(config.request_max_age_days).ok_or_else(|| {
        anyhow::anyhow!(
            "REQUEST_MAX_AGE_DAYS out of range: {}",
            config.request_max_age_days
        )
    })
}

/// Run `expire_stale` on every tick of `period` until `shutdown` resolves
///
/// The first sweep runs immediately. A failed sweep is logged and retried on
/// the next tick. Returns the number of sweeps attempted.
pub async fn run_sweeper<S, F>(
    engine: &FormationEngine<S>,
    max_age: chrono::Duration,
    period: Duration,
    shutdown: F,
) -> u64
where
    S: EntityStore,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut sweeps = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(sweeps, "Sweeper stopping");
                return sweeps;
            }
            _ = ticker.tick() => {
                sweeps += 1;
                match engine.expire_stale(max_age).await {
                    Ok(expired) => info!(expired, "Sweep finished"),
                    Err(e) => error!(error = %e, "Sweep failed"),
                }
            }
        }
    }
}
