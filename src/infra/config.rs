//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument.
//! A missing or unreadable file falls back to built-in defaults, which
//! reproduce the deployed tunables: 2 cm deviation, 15 s travel time,
//! 200 ms poll cadence.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Settle time between measurement cycles (ms)
    pub settle_ms: u64,
    /// Timeout waiting for the echo rising edge (ms)
    pub echo_start_timeout_ms: u64,
    /// Timeout waiting for the echo falling edge (ms)
    pub echo_end_timeout_ms: u64,
    /// Distance profile replayed by the simulated pin driver (cm)
    pub sim_profile_cm: Vec<f64>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            settle_ms: 60,
            echo_start_timeout_ms: 100,
            echo_end_timeout_ms: 60,
            sim_profile_cm: default_sim_profile(),
        }
    }
}

/// Quiet baseline with one approach per pass, enough to exercise the
/// detector when running against the simulated driver.
fn default_sim_profile() -> Vec<f64> {
    let mut profile = vec![160.0; 12];
    profile.extend_from_slice(&[112.5; 6]);
    profile.extend_from_slice(&[160.0; 12]);
    profile
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum distance drop to count as a rider (cm)
    pub deviation_cm: f64,
    /// Assumed maximum ride duration, drives the decay window (s)
    pub travel_time_secs: u64,
    /// Coordinator poll cadence (ms)
    pub poll_interval_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { deviation_cm: 2.0, travel_time_secs: 15, poll_interval_ms: 200 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    settle_ms: u64,
    echo_start_timeout_ms: u64,
    echo_end_timeout_ms: u64,
    sim_profile_cm: Vec<f64>,
    deviation_cm: f64,
    travel_time_secs: u64,
    poll_interval_ms: u64,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            settle_ms: toml_config.sensor.settle_ms,
            echo_start_timeout_ms: toml_config.sensor.echo_start_timeout_ms,
            echo_end_timeout_ms: toml_config.sensor.echo_end_timeout_ms,
            sim_profile_cm: toml_config.sensor.sim_profile_cm,
            deviation_cm: toml_config.detection.deviation_cm,
            travel_time_secs: toml_config.detection.travel_time_secs,
            poll_interval_ms: toml_config.detection.poll_interval_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn settle_ms(&self) -> u64 {
        self.settle_ms
    }

    pub fn echo_start_timeout_ms(&self) -> u64 {
        self.echo_start_timeout_ms
    }

    pub fn echo_end_timeout_ms(&self) -> u64 {
        self.echo_end_timeout_ms
    }

    pub fn sim_profile_cm(&self) -> &[f64] {
        &self.sim_profile_cm
    }

    pub fn deviation_cm(&self) -> f64 {
        self.deviation_cm
    }

    pub fn travel_time_secs(&self) -> u64 {
        self.travel_time_secs
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the settle time
    #[cfg(test)]
    pub fn with_settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Builder method for tests to set the travel time
    #[cfg(test)]
    pub fn with_travel_time_secs(mut self, secs: u64) -> Self {
        self.travel_time_secs = secs;
        self
    }

    /// Builder method for tests to set the poll cadence
    #[cfg(test)]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }
}
