//! Rider decay worker
//!
//! Models riders exiting: nobody is assumed to ride longer than the
//! configured travel time, so the entire count is cleared once per
//! window. This is a coarse decay, not a per-rider timer. The wait is
//! sliced into one-second ticks so a stop signal is observed within at
//! most one second.

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::occupancy::EscalatorOccupancy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub struct DecayWorker {
    occupancy: Arc<EscalatorOccupancy>,
    travel_time_secs: u64,
    metrics: Arc<Metrics>,
}

impl DecayWorker {
    pub fn new(config: &Config, occupancy: Arc<EscalatorOccupancy>, metrics: Arc<Metrics>) -> Self {
        Self {
            occupancy,
            // a zero window would spin draining
            travel_time_secs: config.travel_time_secs().max(1),
            metrics,
        }
    }

    /// Run the decay loop until shutdown
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(travel_time_secs = %self.travel_time_secs, "decay_worker_started");

        loop {
            let drained = self.occupancy.drain();
            if drained > 0 {
                info!(drained = %drained, "decay_reset");
                self.metrics.record_decay(drained);
            }

            for _ in 0..self.travel_time_secs {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("decay_worker_stopped");
                            return;
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
        }
    }
}
