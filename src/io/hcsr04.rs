//! HC-SR04 ultrasonic distance sampling
//!
//! Measurement cycle:
//! - 10 µs trigger pulse
//! - echo line rises when the burst is emitted, falls when the
//!   reflection returns; the pulse width is the round-trip time
//! - distance = half the round trip at the speed of sound
//!
//! Both edge waits are bounded. A sensor that never toggles produces
//! `InvalidPulse` for that cycle instead of hanging the process.

use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::gpio::TriggerEcho;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Speed of sound at room temperature (cm/s)
pub const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Minimum trigger pulse width required by the sensor
const TRIGGER_PULSE: Duration = Duration::from_micros(10);

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("echo {edge} edge not observed within {timeout_ms}ms")]
    InvalidPulse { edge: &'static str, timeout_ms: u64 },
}

/// Convert an echo pulse duration to centimeters, rounded to 2 decimals.
/// The pulse covers the round trip, so only half of it counts.
pub fn distance_cm(pulse: Duration) -> f64 {
    let raw = (SPEED_OF_SOUND_CM_S / 2.0) * pulse.as_secs_f64();
    (raw * 100.0).round() / 100.0
}

/// Continuous distance sampler
///
/// Runs trigger/measure cycles and publishes the most recent distance
/// into a watch holder. Readers always see the latest value without
/// blocking; `None` means no valid measurement yet (or the last cycle
/// timed out).
pub struct DistanceSampler {
    driver: Arc<dyn TriggerEcho>,
    settle: Duration,
    echo_start_timeout: Duration,
    echo_end_timeout: Duration,
    distance_tx: watch::Sender<Option<f64>>,
    metrics: Arc<Metrics>,
}

impl DistanceSampler {
    pub fn new(
        config: &Config,
        driver: Arc<dyn TriggerEcho>,
        metrics: Arc<Metrics>,
    ) -> (Self, watch::Receiver<Option<f64>>) {
        let (distance_tx, distance_rx) = watch::channel(None);
        let sampler = Self {
            driver,
            settle: Duration::from_millis(config.settle_ms()),
            echo_start_timeout: Duration::from_millis(config.echo_start_timeout_ms()),
            echo_end_timeout: Duration::from_millis(config.echo_end_timeout_ms()),
            distance_tx,
            metrics,
        };
        (sampler, distance_rx)
    }

    /// Drive the trigger line through one 10 µs pulse.
    /// Spin-waits for the pulse width; async timers are far too coarse.
    fn trigger_pulse(&self) {
        self.driver.set_trigger(false);
        self.driver.set_trigger(true);
        let start = Instant::now();
        while start.elapsed() < TRIGGER_PULSE {
            std::hint::spin_loop();
        }
        self.driver.set_trigger(false);
    }

    /// Busy-poll the echo line for the requested level, yielding to the
    /// runtime between reads. Bounded by `timeout` per edge.
    async fn wait_for_echo(
        &self,
        level: bool,
        timeout: Duration,
        edge: &'static str,
    ) -> Result<Instant, SensorError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.driver.read_echo() == level {
                return Ok(Instant::now());
            }
            if Instant::now() >= deadline {
                return Err(SensorError::InvalidPulse {
                    edge,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::task::yield_now().await;
        }
    }

    /// Run one full trigger/echo cycle and return the measured distance.
    pub async fn measure_once(&self) -> Result<f64, SensorError> {
        self.trigger_pulse();
        let pulse_start = self.wait_for_echo(true, self.echo_start_timeout, "rising").await?;
        let pulse_end = self.wait_for_echo(false, self.echo_end_timeout, "falling").await?;
        Ok(distance_cm(pulse_end - pulse_start))
    }

    /// Start the sampling loop
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            settle_ms = %self.settle.as_millis(),
            echo_start_timeout_ms = %self.echo_start_timeout.as_millis(),
            echo_end_timeout_ms = %self.echo_end_timeout.as_millis(),
            "sampler_started"
        );

        loop {
            match self.measure_once().await {
                Ok(distance) => {
                    self.distance_tx.send_replace(Some(distance));
                    self.metrics.record_measurement();
                    trace!(distance_cm = distance, "sampler_reading");
                }
                Err(e) => {
                    // No measurement this cycle; the next cycle is the retry
                    self.distance_tx.send_replace(None);
                    self.metrics.record_invalid_pulse();
                    debug!(error = %e, "sampler_invalid_pulse");
                }
            }

            // Settle between cycles, staying responsive to shutdown
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sampler_stopped");
                        return;
                    }
                }
                _ = tokio::time::sleep(self.settle) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gpio::SimulatedEcho;

    fn sampler_with(driver: SimulatedEcho) -> (DistanceSampler, watch::Receiver<Option<f64>>) {
        let config = Config::default().with_settle_ms(5);
        DistanceSampler::new(&config, Arc::new(driver), Arc::new(Metrics::new()))
    }

    #[test]
    fn test_distance_conversion() {
        // 10 ms round trip -> 171.5 cm
        assert_eq!(distance_cm(Duration::from_millis(10)), 171.5);
        // 1 ms round trip -> 17.15 cm
        assert_eq!(distance_cm(Duration::from_millis(1)), 17.15);
    }

    #[test]
    fn test_distance_rounded_to_2_decimals() {
        // 123 µs -> 17150 * 0.000123 = 2.10945 -> 2.11
        assert_eq!(distance_cm(Duration::from_micros(123)), 2.11);
        assert_eq!(distance_cm(Duration::ZERO), 0.0);
    }

    #[tokio::test]
    async fn test_measure_once_reads_simulated_distance() {
        let (sampler, _rx) = sampler_with(SimulatedEcho::new(vec![100.0]));
        let distance = sampler.measure_once().await.unwrap();
        // Scheduling jitter skews the observed edges a little
        assert!((60.0..140.0).contains(&distance), "distance out of range: {}", distance);
    }

    #[tokio::test]
    async fn test_measure_once_times_out_on_dead_sensor() {
        let (sampler, _rx) = sampler_with(SimulatedEcho::new(Vec::new()));
        let start = Instant::now();
        let result = sampler.measure_once().await;
        assert!(result.is_err());
        // Bounded by the rising-edge timeout, with scheduling slack
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_run_publishes_none_on_timeout() {
        let (sampler, rx) = sampler_with(SimulatedEcho::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*rx.borrow(), None);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
