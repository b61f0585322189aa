//! RoadView Replay
//!
//! Loads a recording directory (one JSON fusion frame per file, named by
//! capture time) into a windowed RoadView store and summarizes the result.
//!
//! # Usage
//!
//! ```ignore
//! use roadview_replay::{load_directory, ReplayConfig};
//!
//! let mut config = ReplayConfig::new("./recordings/geddes_huron");
//! config.manager = roadview_core::ManagerConfig::windowed(300);
//!
//! let replay = load_directory(&config)?;
//! println!("{} live trajectories", replay.manager.trajectory_count());
//! ```

mod config;
mod error;
mod ingest;
mod summary;

pub use config::ReplayConfig;
pub use error::ReplayError;
pub use ingest::{
    ingest_frame, list_frame_files, load_directory, parse_frame_timestamp, FusionFrameFile,
    Replay, ReplayManager, ReplayStats,
};
pub use summary::{ReplaySummary, TrajectorySummary};
