//! LedgerSweep Binary
//!
//! Wires the rate source, ledger store, services, and settlement sweep
//! scheduler, then runs until interrupted.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgersweep_engine::{EngineConfig, LedgerEngine};
use ledgersweep_engine::notifier::LogNotifier;
use ledgersweep_engine::scheduler::SweepScheduler;
use ledgersweep_rates::{CachedRateSource, HttpRateSource, RateCacheConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting LedgerSweep");

    // Load configuration
    let config = EngineConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Rate source: HTTP quotes behind a last-known-rate cache
    let http_source = HttpRateSource::new(config.rate_base_url.clone(), config.rate_timeout)
        .map_err(|e| anyhow::anyhow!("Rate source error: {}", e))?;
    let rates = Arc::new(CachedRateSource::new(
        Arc::new(http_source),
        RateCacheConfig::default(),
    ));

    let engine = Arc::new(LedgerEngine::new(
        config.clone(),
        rates,
        Arc::new(LogNotifier),
    ));

    // The house account must exist before the first sweep
    let house = engine
        .bootstrap_house()
        .map_err(|e| anyhow::anyhow!("Bootstrap error: {}", e))?;
    info!(
        house_user = %house.user_id,
        currency = %house.currency,
        "House account ready"
    );

    let scheduler = SweepScheduler::new(engine.sweeper(), config.sweep_interval);
    let (scheduler_handle, shutdown) = scheduler.spawn();

    info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        settlement_currency = %config.settlement_currency,
        "LedgerSweep running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if shutdown.send(true).is_err() {
        error!("Scheduler already stopped");
    }
    scheduler_handle.await?;

    info!("LedgerSweep shutdown complete");
    Ok(())
}
