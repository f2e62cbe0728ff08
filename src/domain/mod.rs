//! Domain models - core types shared across the system
//!
//! This module contains the canonical data types used throughout:
//! - `EscalatorStatus` - derived running/stopped state
//! - `OccupancySnapshot` - consistent view of the occupancy state

pub mod types;

pub use types::{EscalatorStatus, OccupancySnapshot};
