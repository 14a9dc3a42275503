// Teamforge - pending request expiry sweeper

use std::time::Duration;

use tokio::signal;
use tracing::{error, info};

use teamforge_common::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    teamforge_app::init_tracing(&config);

    info!("Starting Teamforge request sweeper");

    let engine = teamforge_app::build_engine(&config).await.map_err(|e| {
        error!("Failed to initialise engine: {}", e);
        e
    })?;

    let max_age = teamforge_app::request_max_age(&config)?;
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));
    info!(
        max_age_days = config.request_max_age_days,
        interval_secs = period.as_secs(),
        "Sweeper configured"
    );

    teamforge_app::run_sweeper(&engine, max_age, period, shutdown_signal()).await;

    info!("Sweeper shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
