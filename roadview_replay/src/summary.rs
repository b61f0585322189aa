//! JSON summary of a loaded recording.

use crate::ingest::{Replay, ReplayStats};
use chrono::NaiveDateTime;
use roadview_core::{motion, ObservationContainer, Step};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-trajectory entry of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub track_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_uuid: Option<Uuid>,
    pub observations: usize,
    pub first_step: Step,
    pub last_step: Step,
    /// Distance along the live part of the chain, in position units
    pub path_length: f64,
}

/// Complete replay summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub data_dir: PathBuf,
    pub stats: ReplayStats,

    /// Live window
    pub earliest_step: Step,
    pub last_step: Step,
    pub live_frames: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<NaiveDateTime>,

    pub evicted_frames: u64,
    pub live_observations: usize,

    /// Live trajectories sorted by id
    pub trajectories: Vec<TrajectorySummary>,
}

impl ReplaySummary {
    pub fn from_replay(data_dir: &Path, replay: &Replay) -> Self {
        let manager = &replay.manager;

        let mut trajectories: Vec<TrajectorySummary> = manager
            .trajectories()
            .map(|trajectory| TrajectorySummary {
                track_id: trajectory.id().clone(),
                track_uuid: replay.track_uuids.get(trajectory.id()).copied(),
                observations: trajectory.len(),
                first_step: trajectory.first_step().unwrap_or(-1),
                last_step: trajectory.last_step().unwrap_or(-1),
                path_length: trajectory
                    .first()
                    .map_or(0.0, |head| motion::path_length(manager.arena(), head)),
            })
            .collect();
        trajectories.sort_by(|a, b| a.track_id.cmp(&b.track_id));

        Self {
            data_dir: data_dir.to_path_buf(),
            stats: replay.stats.clone(),
            earliest_step: manager.earliest_step(),
            last_step: manager.last_step(),
            live_frames: manager.frame_count(),
            first_timestamp: manager.frames().next().and_then(|f| f.timestamp().copied()),
            last_timestamp: manager.last_frame().ok().and_then(|f| f.timestamp().copied()),
            evicted_frames: manager.evicted_total(),
            live_observations: manager.observation_count(),
            trajectories,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
