//! Directory ingestion of recorded fusion frames.
//!
//! Each file holds one frame. Files are ordered by the timestamp encoded in
//! their name, assigned consecutive steps and routed into a windowed
//! [`TrajectoryManager`].

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use chrono::{NaiveDateTime, TimeDelta};
use roadview_core::{InsertMode, RoadUserPoint, TrajectoryManager};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Store type produced by a replay.
pub type ReplayManager = TrajectoryManager<RoadUserPoint, NaiveDateTime>;

/// Contents of one frame file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionFrameFile {
    /// Fused road users visible in this frame
    #[serde(default)]
    pub fusion: Vec<RoadUserPoint>,
}

/// Counters collected while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub observations_loaded: usize,
    pub observations_skipped: usize,
}

/// A loaded recording.
pub struct Replay {
    pub manager: ReplayManager,
    pub stats: ReplayStats,
    /// Globally unique id assigned to each live trajectory
    pub track_uuids: HashMap<String, Uuid>,
}

/// Parses a frame file stem such as `2023-09-05 10-00-00-039784`.
///
/// The whole-second part follows `config.timestamp_format`; the optional
/// suffix after `config.fraction_separator` is read as a decimal fraction of
/// a second (up to nanosecond precision).
pub fn parse_frame_timestamp(stem: &str, config: &ReplayConfig) -> Result<NaiveDateTime, ReplayError> {
    let (whole, fraction) = match config.fraction_separator {
        Some(separator) => match stem.rsplit_once(separator) {
            Some((whole, fraction)) if !fraction.is_empty() && fraction.bytes().all(|b| b.is_ascii_digit()) => {
                (whole, Some(fraction))
            }
            _ => return Err(ReplayError::timestamp(stem, "missing fractional seconds")),
        },
        None => (stem, None),
    };

    let base = NaiveDateTime::parse_from_str(whole, &config.timestamp_format)
        .map_err(|e| ReplayError::timestamp(stem, e))?;

    let Some(fraction) = fraction else {
        return Ok(base);
    };
    if fraction.len() > 9 {
        return Err(ReplayError::timestamp(stem, "more than 9 fractional digits"));
    }
    let digits: i64 = fraction.parse().map_err(|e| ReplayError::timestamp(stem, e))?;
    let nanos = digits * 10_i64.pow(9 - fraction.len() as u32);
    Ok(base + TimeDelta::nanoseconds(nanos))
}

/// Frame files in `config.data_dir`, ordered by their timestamp.
///
/// Files whose names do not parse are skipped with a warning; the second of
/// two files with the same timestamp is skipped as well.
pub fn list_frame_files(
    config: &ReplayConfig,
    stats: &mut ReplayStats,
) -> Result<Vec<(NaiveDateTime, PathBuf)>, ReplayError> {
    let dir = &config.data_dir;
    let entries = std::fs::read_dir(dir).map_err(|e| ReplayError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ReplayError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(config.extension.as_str()) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match parse_frame_timestamp(stem, config) {
            Ok(timestamp) => files.push((timestamp, path)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping frame file");
                stats.files_skipped += 1;
            }
        }
    }

    files.sort();
    let before = files.len();
    files.dedup_by(|later, earlier| {
        let duplicate = later.0 == earlier.0;
        if duplicate {
            warn!(path = %later.1.display(), "skipping frame file with duplicate timestamp");
        }
        duplicate
    });
    stats.files_skipped += before - files.len();

    Ok(files)
}

fn read_frame_file(path: &Path) -> Result<FusionFrameFile, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReplayError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| ReplayError::json(path, e))
}

/// Routes one frame's road users into the store at the next step.
///
/// Points without an id, or rejected by the store, are skipped. The step is
/// occupied even when no point survives.
pub fn ingest_frame(
    manager: &mut ReplayManager,
    frame: FusionFrameFile,
    timestamp: NaiveDateTime,
    track_uuids: &mut HashMap<String, Uuid>,
    stats: &mut ReplayStats,
) {
    let step = manager.next_step();

    for mut point in frame.fusion {
        let Some(track_id) = point.track_id.clone() else {
            warn!(step, "skipping road user without id");
            stats.observations_skipped += 1;
            continue;
        };
        // First uuid seen for a track wins, whether recorded or generated
        let uuid = *track_uuids
            .entry(track_id.clone())
            .or_insert_with(|| point.track_uuid.unwrap_or_else(Uuid::new_v4));
        point.track_uuid = Some(uuid);

        match manager.add_object(point, track_id.clone(), step, Some(timestamp), InsertMode::Append) {
            Ok(_) => stats.observations_loaded += 1,
            Err(e) => {
                warn!(step, track = %track_id, error = %e, "skipping road user");
                stats.observations_skipped += 1;
            }
        }
    }

    if manager.last_step() < step {
        if let Err(e) = manager.add_batch_as_new_frame(Vec::new(), Some(timestamp)) {
            warn!(step, error = %e, "could not create empty frame");
        }
    }

    // Forget identities whose trajectories were retired by the window
    track_uuids.retain(|id, _| manager.trajectory_at(id).is_some());
}

/// Loads every frame file of `config.data_dir` into a new store.
pub fn load_directory(config: &ReplayConfig) -> Result<Replay, ReplayError> {
    config.validate()?;

    let mut stats = ReplayStats::default();
    let files = list_frame_files(config, &mut stats)?;
    info!(dir = %config.data_dir.display(), files = files.len(), "loading recording");

    let mut manager = ReplayManager::new(config.manager);
    let mut track_uuids = HashMap::new();

    for (timestamp, path) in files {
        let frame = read_frame_file(&path)?;
        debug!(path = %path.display(), objects = frame.fusion.len(), "frame file read");
        ingest_frame(&mut manager, frame, timestamp, &mut track_uuids, &mut stats);
        stats.files_read += 1;
    }

    info!(
        frames = manager.frame_count(),
        trajectories = manager.trajectory_count(),
        loaded = stats.observations_loaded,
        skipped = stats.observations_skipped,
        evicted = manager.evicted_total(),
        "recording loaded"
    );

    Ok(Replay {
        manager,
        stats,
        track_uuids,
    })
}
