//! Shared types for the escalator PoC

use serde::Serialize;

/// Derived escalator state: running iff at least one rider is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalatorStatus {
    Running,
    Stopped,
}

impl EscalatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalatorStatus::Running => "running",
            EscalatorStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for EscalatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent view of the occupancy state, taken under a single lock
/// acquisition so `status` always agrees with `count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancySnapshot {
    /// Reference distance from the previous poll cycle (cm)
    pub last_measurement: f64,
    /// Riders currently assumed to be on the escalator
    pub count: u32,
    /// Derived state: `Running` iff `count > 0`
    pub status: EscalatorStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(EscalatorStatus::Running.as_str(), "running");
        assert_eq!(EscalatorStatus::Stopped.as_str(), "stopped");
    }
}
