//! Trigger/echo pin access
//!
//! `TriggerEcho` is the seam between the sampler and the actual pins.
//! The sampler only ever drives the trigger line and reads the echo
//! line, so a board-specific GPIO backend plugs in behind this trait
//! without touching the measurement logic. The backend shipped here is
//! `SimulatedEcho`, which answers trigger pulses with real echo timing
//! derived from a configured distance profile.

use crate::io::hcsr04::SPEED_OF_SOUND_CM_S;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Minimal pin interface for an HC-SR04 style sensor
pub trait TriggerEcho: Send + Sync {
    /// Set the trigger output level
    fn set_trigger(&self, level: bool);

    /// Read the echo input level
    fn read_echo(&self) -> bool;
}

/// Delay between the trigger falling edge and the echo rising edge.
/// Real sensors need a couple hundred microseconds to emit the burst.
const RESPONSE_DELAY: Duration = Duration::from_micros(200);

#[derive(Debug)]
struct SimState {
    trigger_high: bool,
    echo_rise: Option<Instant>,
    echo_fall: Option<Instant>,
    profile_idx: usize,
}

/// Simulated trigger/echo pin pair
///
/// Each trigger cycle schedules one echo pulse whose width encodes the
/// next distance in the profile (wrapping around). An empty profile
/// behaves like a sensor with nothing in range: the echo line never
/// rises.
pub struct SimulatedEcho {
    profile_cm: Vec<f64>,
    state: Mutex<SimState>,
}

impl SimulatedEcho {
    pub fn new(profile_cm: Vec<f64>) -> Self {
        Self {
            profile_cm,
            state: Mutex::new(SimState {
                trigger_high: false,
                echo_rise: None,
                echo_fall: None,
                profile_idx: 0,
            }),
        }
    }
}

impl TriggerEcho for SimulatedEcho {
    fn set_trigger(&self, level: bool) {
        let mut state = self.state.lock();
        if level {
            state.trigger_high = true;
            return;
        }
        if !state.trigger_high {
            return;
        }
        // Trigger falling edge arms the next echo pulse
        state.trigger_high = false;
        if self.profile_cm.is_empty() {
            state.echo_rise = None;
            state.echo_fall = None;
            return;
        }
        let distance_cm = self.profile_cm[state.profile_idx % self.profile_cm.len()];
        state.profile_idx = state.profile_idx.wrapping_add(1);

        // Echo pulse width is the full round trip at the speed of sound
        let round_trip = Duration::from_secs_f64(distance_cm / (SPEED_OF_SOUND_CM_S / 2.0));
        let rise = Instant::now() + RESPONSE_DELAY;
        state.echo_rise = Some(rise);
        state.echo_fall = Some(rise + round_trip);
    }

    fn read_echo(&self) -> bool {
        let state = self.state.lock();
        match (state.echo_rise, state.echo_fall) {
            (Some(rise), Some(fall)) => {
                let now = Instant::now();
                now >= rise && now < fall
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_trigger(driver: &SimulatedEcho) {
        driver.set_trigger(false);
        driver.set_trigger(true);
        driver.set_trigger(false);
    }

    #[test]
    fn test_echo_low_before_trigger() {
        let driver = SimulatedEcho::new(vec![100.0]);
        assert!(!driver.read_echo());
    }

    #[test]
    fn test_echo_pulse_width_encodes_distance() {
        // 171.5 cm -> 10 ms round trip at 34300 cm/s
        let driver = SimulatedEcho::new(vec![171.5]);
        pulse_trigger(&driver);

        let armed = Instant::now();
        while !driver.read_echo() {
            assert!(armed.elapsed() < Duration::from_millis(10), "echo never rose");
            std::hint::spin_loop();
        }
        let rise = Instant::now();
        while driver.read_echo() {
            assert!(rise.elapsed() < Duration::from_millis(50), "echo never fell");
            std::hint::spin_loop();
        }
        let width = rise.elapsed();

        assert!(width >= Duration::from_millis(9), "width too short: {:?}", width);
        assert!(width <= Duration::from_millis(12), "width too long: {:?}", width);
    }

    #[test]
    fn test_profile_wraps_around() {
        let driver = SimulatedEcho::new(vec![50.0, 100.0]);
        for _ in 0..3 {
            pulse_trigger(&driver);
        }
        // Third trigger wrapped back to profile index 0
        assert_eq!(driver.state.lock().profile_idx, 3);
    }

    #[test]
    fn test_empty_profile_never_echoes() {
        let driver = SimulatedEcho::new(Vec::new());
        pulse_trigger(&driver);
        std::thread::sleep(Duration::from_millis(2));
        assert!(!driver.read_echo());
    }
}
