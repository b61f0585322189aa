//! Store configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Configuration for the TrajectoryManager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Maximum number of live frames (default: unbounded).
    ///
    /// Once an insertion creates a frame that pushes the live count above
    /// this bound, the oldest frames are evicted until it holds again.
    #[serde(default)]
    pub max_frames: Option<NonZeroUsize>,
}

impl ManagerConfig {
    /// Unbounded configuration.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Sliding window over the most recent `max_frames` frames.
    ///
    /// A zero bound is treated as unbounded.
    pub fn windowed(max_frames: usize) -> Self {
        Self {
            max_frames: NonZeroUsize::new(max_frames),
        }
    }

    /// Returns true if the live frame count `count` is over the bound.
    pub fn exceeds(&self, count: usize) -> bool {
        match self.max_frames {
            Some(max) => count > max.get(),
            None => false,
        }
    }
}
