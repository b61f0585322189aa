//! Loading recording directories end to end.

use roadview_core::{ManagerConfig, ObservationContainer};
use roadview_replay::{load_directory, ReplayConfig, ReplayError, ReplaySummary};
use std::fs;
use std::path::Path;

fn write_frame(dir: &Path, stem: &str, body: &str) {
    fs::write(dir.join(format!("{stem}.json")), body).unwrap();
}

fn object(id: u32, lat: f64, lon: f64) -> String {
    format!(
        r#"{{"id": {id}, "lat": {lat}, "lon": {lon}, "heading": 90.0, "width": 1.8, "length": 4.6}}"#
    )
}

fn fusion(objects: &[String]) -> String {
    format!(r#"{{"fusion": [{}]}}"#, objects.join(","))
}

/// Four frames, written out of order: track 1 throughout, track 2 only in
/// the first frame, track 3 from the third frame on.
fn recording() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_frame(
        dir.path(),
        "2023-09-05 10-00-00-300000",
        &fusion(&[object(1, 2.0, 0.0), object(3, 5.0, 5.0)]),
    );
    write_frame(
        dir.path(),
        "2023-09-05 10-00-00-000000",
        &fusion(&[object(1, 0.0, 0.0), object(2, 9.0, 9.0)]),
    );
    write_frame(dir.path(), "2023-09-05 10-00-00-100000", &fusion(&[object(1, 1.0, 0.0)]));
    write_frame(
        dir.path(),
        "2023-09-05 10-00-00-400000",
        &fusion(&[object(1, 3.0, 0.0), object(3, 5.0, 6.0)]),
    );
    fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
    dir
}

#[test]
fn loads_frames_in_timestamp_order() {
    let dir = recording();
    let replay = load_directory(&ReplayConfig::new(dir.path())).unwrap();
    let manager = &replay.manager;

    assert_eq!(replay.stats.files_read, 4);
    assert_eq!(replay.stats.observations_loaded, 7);
    assert_eq!(manager.frame_count(), 4);
    assert_eq!(manager.last_step(), 3);

    let track = manager.trajectory_at(&"1".to_string()).unwrap();
    assert_eq!(track.steps(), &[0, 1, 2, 3]);
    let xs: Vec<f64> = track.iter().map(|k| manager.observation(k).unwrap().x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn window_evicts_and_retires() {
    let dir = recording();
    let mut config = ReplayConfig::new(dir.path());
    config.manager = ManagerConfig::windowed(2);

    let replay = load_directory(&config).unwrap();
    let manager = &replay.manager;

    assert_eq!(manager.earliest_step(), 2);
    assert_eq!(manager.evicted_total(), 2);
    assert!(manager.trajectory_at(&"2".to_string()).is_none());
    assert!(!replay.track_uuids.contains_key("2"));
    assert_eq!(manager.trajectory_at(&"1".to_string()).unwrap().len(), 2);

    let summary = ReplaySummary::from_replay(dir.path(), &replay);
    assert_eq!(summary.live_frames, 2);
    let ids: Vec<&str> = summary.trajectories.iter().map(|t| t.track_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(summary.trajectories[0].path_length, 1.0);
    assert_eq!(summary.trajectories[1].path_length, 1.0);
    assert!(summary.trajectories.iter().all(|t| t.track_uuid.is_some()));
}

#[test]
fn summary_export_round_trip() {
    let dir = recording();
    let replay = load_directory(&ReplayConfig::new(dir.path())).unwrap();
    let summary = ReplaySummary::from_replay(dir.path(), &replay);

    let out = dir.path().join("summary.out");
    summary.write_to_file(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["live_frames"], 4);
    assert_eq!(json["first_timestamp"], "2023-09-05T10:00:00");
    assert_eq!(json["last_timestamp"], "2023-09-05T10:00:00.400");
}

#[test]
fn bad_file_names_are_skipped() {
    let dir = recording();
    write_frame(dir.path(), "snapshot", &fusion(&[object(1, 0.0, 0.0)]));

    let replay = load_directory(&ReplayConfig::new(dir.path())).unwrap();
    assert_eq!(replay.stats.files_skipped, 1);
    assert_eq!(replay.manager.frame_count(), 4);
}

#[test]
fn malformed_frame_is_an_error() {
    let dir = recording();
    write_frame(dir.path(), "2023-09-05 10-00-01-000000", "{\"fusion\": [");

    assert!(matches!(
        load_directory(&ReplayConfig::new(dir.path())),
        Err(ReplayError::Json { .. })
    ));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ReplayConfig::new(dir.path().join("absent"));
    assert!(matches!(load_directory(&config), Err(ReplayError::Io { .. })));
}
