//! Services - occupancy logic and control loop
//!
//! This module contains the core business logic services:
//! - `occupancy` - Rider count and hysteresis detection state
//! - `decay` - Timed decay worker modeling riders exiting
//! - `coordinator` - Poll loop and worker lifecycle

pub mod coordinator;
pub mod decay;
pub mod occupancy;

// Re-export commonly used types
pub use coordinator::Coordinator;
pub use decay::DecayWorker;
pub use occupancy::{EscalatorOccupancy, OccupancyError};
