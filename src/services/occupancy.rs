//! Escalator occupancy state
//!
//! Single owner of the rider count and the reference measurement. The
//! coordinator's increment path and the decay worker's drain path
//! mutate this state from different tasks, so both fields live behind
//! one mutex and every operation is a single lock acquisition.
//!
//! Key behaviors:
//! - A rider is counted only when the distance drops by at least the
//!   deviation threshold (an approaching object); readings that move
//!   away or jitter below the threshold never count
//! - The count can never go negative: decrements are clamped
//! - `snapshot()` returns count and derived status from the same lock
//!   hold, so readers never see them disagree

use crate::domain::types::{EscalatorStatus, OccupancySnapshot};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OccupancyError {
    #[error("measurement update requires a finite value, got {got}")]
    InvalidInput { got: String },
}

#[derive(Debug)]
struct Inner {
    count: u32,
    last_measurement: f64,
}

pub struct EscalatorOccupancy {
    deviation_cm: f64,
    inner: Mutex<Inner>,
}

impl EscalatorOccupancy {
    pub fn new(deviation_cm: f64) -> Self {
        Self { deviation_cm, inner: Mutex::new(Inner { count: 0, last_measurement: 0.0 }) }
    }

    /// Apply the hysteresis rule to a new reading.
    ///
    /// Increments the count iff the reading dropped by at least the
    /// deviation threshold relative to the reference: someone stepping
    /// into the sensor's field of view is closer than whatever was
    /// measured before. An absent reading is a no-op. Returns whether a
    /// rider was counted.
    pub fn compare_and_increase(&self, measurement: Option<f64>) -> bool {
        let Some(m) = measurement else {
            return false;
        };
        let mut inner = self.inner.lock();
        if (inner.last_measurement - m).abs() >= self.deviation_cm && m <= inner.last_measurement {
            inner.count += 1;
            true
        } else {
            false
        }
    }

    /// Overwrite the reference measurement for the next comparison.
    pub fn set_last_measurement(&self, measurement: Option<f64>) -> Result<(), OccupancyError> {
        let m = measurement
            .ok_or_else(|| OccupancyError::InvalidInput { got: "absent".to_string() })?;
        if !m.is_finite() {
            return Err(OccupancyError::InvalidInput { got: m.to_string() });
        }
        self.inner.lock().last_measurement = m;
        Ok(())
    }

    /// Decrease the rider count, clamped at zero.
    pub fn decrease_count(&self, amount: u32) {
        let mut inner = self.inner.lock();
        inner.count = inner.count.saturating_sub(amount);
    }

    /// Take the entire count to zero and return what was drained.
    /// One lock hold, so increments can never be lost in between.
    pub fn drain(&self) -> u32 {
        let mut inner = self.inner.lock();
        std::mem::take(&mut inner.count)
    }

    pub fn count(&self) -> u32 {
        self.inner.lock().count
    }

    pub fn last_measurement(&self) -> f64 {
        self.inner.lock().last_measurement
    }

    pub fn status(&self) -> EscalatorStatus {
        Self::status_for(self.inner.lock().count)
    }

    /// Consistent view of the whole state under one lock hold
    pub fn snapshot(&self) -> OccupancySnapshot {
        let inner = self.inner.lock();
        OccupancySnapshot {
            last_measurement: inner.last_measurement,
            count: inner.count,
            status: Self::status_for(inner.count),
        }
    }

    fn status_for(count: u32) -> EscalatorStatus {
        if count > 0 {
            EscalatorStatus::Running
        } else {
            EscalatorStatus::Stopped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy_at(last_measurement: f64) -> EscalatorOccupancy {
        let occupancy = EscalatorOccupancy::new(2.0);
        occupancy.set_last_measurement(Some(last_measurement)).unwrap();
        occupancy
    }

    #[test]
    fn test_closer_reading_beyond_deviation_increments() {
        let occupancy = occupancy_at(100.0);
        assert!(occupancy.compare_and_increase(Some(95.0)));
        assert_eq!(occupancy.count(), 1);
    }

    #[test]
    fn test_jitter_below_deviation_does_not_increment() {
        let occupancy = occupancy_at(100.0);
        assert!(!occupancy.compare_and_increase(Some(99.0)));
        assert_eq!(occupancy.count(), 0);
    }

    #[test]
    fn test_receding_reading_never_increments() {
        let occupancy = occupancy_at(100.0);
        assert!(!occupancy.compare_and_increase(Some(105.0)));
        assert_eq!(occupancy.count(), 0);
    }

    #[test]
    fn test_deviation_boundary_exactly_at_threshold() {
        let occupancy = occupancy_at(100.0);
        // abs delta exactly 2.0 qualifies
        assert!(occupancy.compare_and_increase(Some(98.0)));
    }

    #[test]
    fn test_deviation_boundary_just_below_threshold() {
        let occupancy = occupancy_at(100.0);
        assert!(!occupancy.compare_and_increase(Some(98.01)));
    }

    #[test]
    fn test_absent_measurement_is_noop() {
        let occupancy = occupancy_at(100.0);
        assert!(!occupancy.compare_and_increase(None));
        assert_eq!(occupancy.count(), 0);
        assert_eq!(occupancy.last_measurement(), 100.0);
    }

    #[test]
    fn test_nan_measurement_never_increments() {
        let occupancy = occupancy_at(100.0);
        assert!(!occupancy.compare_and_increase(Some(f64::NAN)));
        assert_eq!(occupancy.count(), 0);
    }

    #[test]
    fn test_first_reading_against_zero_reference_does_not_count() {
        // Reference starts at 0; the first real reading is farther away
        let occupancy = EscalatorOccupancy::new(2.0);
        assert!(!occupancy.compare_and_increase(Some(100.0)));
    }

    #[test]
    fn test_set_last_measurement_rejects_absent() {
        let occupancy = EscalatorOccupancy::new(2.0);
        let err = occupancy.set_last_measurement(None).unwrap_err();
        assert_eq!(err, OccupancyError::InvalidInput { got: "absent".to_string() });
    }

    #[test]
    fn test_set_last_measurement_rejects_non_finite() {
        let occupancy = EscalatorOccupancy::new(2.0);
        assert!(occupancy.set_last_measurement(Some(f64::NAN)).is_err());
        assert!(occupancy.set_last_measurement(Some(f64::INFINITY)).is_err());
        assert_eq!(occupancy.last_measurement(), 0.0);
    }

    #[test]
    fn test_decrease_count_clamps_at_zero() {
        let occupancy = occupancy_at(100.0);
        occupancy.compare_and_increase(Some(95.0));
        occupancy.decrease_count(5);
        assert_eq!(occupancy.count(), 0);
    }

    #[test]
    fn test_drain_takes_entire_count() {
        let occupancy = occupancy_at(100.0);
        occupancy.compare_and_increase(Some(95.0));
        occupancy.set_last_measurement(Some(95.0)).unwrap();
        occupancy.compare_and_increase(Some(90.0));
        assert_eq!(occupancy.drain(), 2);
        assert_eq!(occupancy.count(), 0);
        assert_eq!(occupancy.drain(), 0);
    }

    #[test]
    fn test_status_derived_from_count() {
        let occupancy = occupancy_at(100.0);
        assert_eq!(occupancy.status(), EscalatorStatus::Stopped);
        occupancy.compare_and_increase(Some(95.0));
        assert_eq!(occupancy.status(), EscalatorStatus::Running);
        occupancy.drain();
        assert_eq!(occupancy.status(), EscalatorStatus::Stopped);
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let occupancy = occupancy_at(100.0);
        occupancy.compare_and_increase(Some(95.0));
        let snapshot = occupancy.snapshot();
        assert_eq!(snapshot.last_measurement, 100.0);
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.status, EscalatorStatus::Running);
    }
}
