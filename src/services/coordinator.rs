//! Poll-loop coordinator
//!
//! Owns the main control loop: spawns the distance sampler and the
//! decay worker, polls the latest reading at a fixed cadence, feeds it
//! into the occupancy state and emits the per-poll status report.
//!
//! Ordering within a poll tick: the comparison always runs against the
//! reference from the previous tick; the reference is advanced only
//! after the report, and only when the new reading is present.

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::gpio::TriggerEcho;
use crate::io::hcsr04::DistanceSampler;
use crate::services::decay::DecayWorker;
use crate::services::occupancy::EscalatorOccupancy;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

pub struct Coordinator {
    occupancy: Arc<EscalatorOccupancy>,
    distance_rx: watch::Receiver<Option<f64>>,
    poll_interval: Duration,
    metrics: Arc<Metrics>,
    sampler_handle: JoinHandle<()>,
    decay_handle: JoinHandle<()>,
}

impl Coordinator {
    /// Spawn the sampler and decay workers and assemble the poll loop
    pub fn start(
        config: &Config,
        driver: Arc<dyn TriggerEcho>,
        occupancy: Arc<EscalatorOccupancy>,
        metrics: Arc<Metrics>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (sampler, distance_rx) = DistanceSampler::new(config, driver, metrics.clone());
        let sampler_handle = tokio::spawn(sampler.run(shutdown.clone()));

        let decay = DecayWorker::new(config, occupancy.clone(), metrics.clone());
        let decay_handle = tokio::spawn(decay.run(shutdown));

        Self {
            occupancy,
            distance_rx,
            poll_interval: Duration::from_millis(config.poll_interval_ms()),
            metrics,
            sampler_handle,
            decay_handle,
        }
    }

    /// Run the poll loop until shutdown, then join both workers
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval_ms = %self.poll_interval.as_millis(), "coordinator_started");

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = poll_timer.tick() => {}
            }

            let poll_start = Instant::now();

            let new_measurement = *self.distance_rx.borrow();
            let counted = self.occupancy.compare_and_increase(new_measurement);
            let snapshot = self.occupancy.snapshot();

            if counted {
                self.metrics.record_rider();
                info!(count = %snapshot.count, "rider_detected");
            }

            info!(
                last_measurement = %snapshot.last_measurement,
                new_measurement = ?new_measurement,
                count = %snapshot.count,
                status = %snapshot.status,
                "escalator_status"
            );

            if new_measurement.is_some() {
                if let Err(e) = self.occupancy.set_last_measurement(new_measurement) {
                    warn!(error = %e, "measurement_rejected");
                }
            }

            self.metrics.record_poll(poll_start.elapsed().as_micros() as u64);
        }

        // Join both workers so nothing outlives the loop
        info!("coordinator_stopping");
        if let Err(e) = self.sampler_handle.await {
            warn!(error = %e, "sampler_join_failed");
        }
        if let Err(e) = self.decay_handle.await {
            warn!(error = %e, "decay_join_failed");
        }
        info!("coordinator_stopped");
    }
}
