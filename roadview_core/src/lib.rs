//! RoadView Core - Windowed Multi-View Trajectory Store
//!
//! Organizes a stream of timestamped road-user observations into two views
//! over the same observation set:
//! 1. **Trajectories**: per-entity time series with an O(1) `prev`/`next` chain
//! 2. **Frames**: per-step snapshots holding at most one observation per entity
//!
//! The [`TrajectoryManager`] keeps both views consistent, indexes frames by
//! step and timestamp, and bounds memory with a sliding window over the most
//! recent frames.
//!
//! Not internally synchronized: share a manager across threads only behind
//! an external lock.

pub mod arena;
pub mod config;
pub mod container;
pub mod error;
pub mod frame;
pub mod manager;
pub mod motion;
pub mod road_user;
pub mod trajectory;

/// Discrete time step. Live steps are non-negative; -1 marks "no frame".
pub type Step = i64;

// Re-export key types for convenience
pub use arena::{Observation, ObservationArena, ObservationKey, ObservationNode};
pub use config::ManagerConfig;
pub use container::ObservationContainer;
pub use error::TrajectoryError;
pub use frame::Frame;
pub use manager::{EvictedFrame, TrajectoryManager};
pub use road_user::{BehaviorType, RoadUserPoint};
pub use trajectory::{InsertMode, Trajectory};
