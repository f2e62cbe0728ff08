//! Escalator PoC - ultrasonic occupancy monitor
//!
//! Estimates how many people are riding an escalator from an HC-SR04
//! time-of-flight sensor and derives a running/stopped status, targeting
//! Raspberry Pi class hardware.
//!
//! Module structure:
//! - `domain/` - Core types (EscalatorStatus, OccupancySnapshot)
//! - `io/` - Sensor access (TriggerEcho driver seam, HC-SR04 sampler)
//! - `services/` - Occupancy logic (occupancy, decay, coordinator)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use escalator_poc::infra::{Config, Metrics};
use escalator_poc::io::{SimulatedEcho, TriggerEcho};
use escalator_poc::services::{Coordinator, EscalatorOccupancy};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Escalator PoC - ultrasonic escalator occupancy monitor
#[derive(Parser, Debug)]
#[command(name = "escalator-poc", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git = %env!("GIT_HASH"),
        "escalator-poc starting"
    );

    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        deviation_cm = %config.deviation_cm(),
        travel_time_secs = %config.travel_time_secs(),
        poll_interval_ms = %config.poll_interval_ms(),
        settle_ms = %config.settle_ms(),
        "config_loaded"
    );

    // The pin backend is pluggable behind TriggerEcho; this build ships
    // the simulated driver, replaying the configured distance profile.
    // Failing to construct the driver is fatal before any loop starts.
    if config.sim_profile_cm().is_empty() {
        return Err("sensor driver setup failed: sim_profile_cm is empty".into());
    }
    let driver: Arc<dyn TriggerEcho> =
        Arc::new(SimulatedEcho::new(config.sim_profile_cm().to_vec()));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create shared components
    let metrics = Arc::new(Metrics::new());
    let occupancy = Arc::new(EscalatorOccupancy::new(config.deviation_cm()));

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Start sampler and decay workers under the coordinator
    let coordinator = Coordinator::start(&config, driver, occupancy, metrics, shutdown_rx.clone());

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the poll loop - joins both workers on shutdown
    coordinator.run(shutdown_rx).await;

    info!("escalator-poc shutdown complete");
    Ok(())
}
