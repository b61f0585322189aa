//! Road-user observation payload.

use crate::arena::Observation;
use nalgebra::Vector2;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maneuver label attached to a road user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    #[default]
    Unknown,
    Constant,
    Accelerate,
    Decelerate,
    Stop,
    LaneKeeping,
    LaneChanging,
    LaneDeparture,
    LeftTurn,
    RightTurn,
    UTurn,
    Yielding,
    Following,
    Overtaking,
    Parking,
    EmergencyBraking,
}

impl BehaviorType {
    pub const ALL: [BehaviorType; 16] = [
        BehaviorType::Unknown,
        BehaviorType::Constant,
        BehaviorType::Accelerate,
        BehaviorType::Decelerate,
        BehaviorType::Stop,
        BehaviorType::LaneKeeping,
        BehaviorType::LaneChanging,
        BehaviorType::LaneDeparture,
        BehaviorType::LeftTurn,
        BehaviorType::RightTurn,
        BehaviorType::UTurn,
        BehaviorType::Yielding,
        BehaviorType::Following,
        BehaviorType::Overtaking,
        BehaviorType::Parking,
        BehaviorType::EmergencyBraking,
    ];

    /// Numeric code: -1 for unknown, 0..=14 otherwise.
    pub fn code(self) -> i8 {
        match self {
            BehaviorType::Unknown => -1,
            BehaviorType::Constant => 0,
            BehaviorType::Accelerate => 1,
            BehaviorType::Decelerate => 2,
            BehaviorType::Stop => 3,
            BehaviorType::LaneKeeping => 4,
            BehaviorType::LaneChanging => 5,
            BehaviorType::LaneDeparture => 6,
            BehaviorType::LeftTurn => 7,
            BehaviorType::RightTurn => 8,
            BehaviorType::UTurn => 9,
            BehaviorType::Yielding => 10,
            BehaviorType::Following => 11,
            BehaviorType::Overtaking => 12,
            BehaviorType::Parking => 13,
            BehaviorType::EmergencyBraking => 14,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BehaviorType::Unknown => "unknown",
            BehaviorType::Constant => "constant",
            BehaviorType::Accelerate => "accelerate",
            BehaviorType::Decelerate => "decelerate",
            BehaviorType::Stop => "stop",
            BehaviorType::LaneKeeping => "lane_keeping",
            BehaviorType::LaneChanging => "lane_changing",
            BehaviorType::LaneDeparture => "lane_departure",
            BehaviorType::LeftTurn => "left_turn",
            BehaviorType::RightTurn => "right_turn",
            BehaviorType::UTurn => "u_turn",
            BehaviorType::Yielding => "yielding",
            BehaviorType::Following => "following",
            BehaviorType::Overtaking => "overtaking",
            BehaviorType::Parking => "parking",
            BehaviorType::EmergencyBraking => "emergency_braking",
        }
    }

    /// Case-insensitive lookup by name; anything unrecognized is `Unknown`.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
            .unwrap_or(BehaviorType::Unknown)
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single observed road user at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadUserPoint {
    /// Planar position (e.g. latitude/longitude or local meters)
    #[serde(alias = "lat")]
    pub x: f64,
    #[serde(alias = "lon")]
    pub y: f64,

    /// Heading in degrees
    #[serde(default)]
    pub heading: Option<f64>,

    #[serde(default)]
    pub width: Option<f64>,

    #[serde(default)]
    pub length: Option<f64>,

    /// Object class label (e.g. "vehicle", "pedestrian")
    #[serde(default)]
    pub category: Option<String>,

    /// Detection confidence [0.0 - 1.0]
    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub behavior: Option<BehaviorType>,

    /// Track identity used before the point is routed. Numeric ids are
    /// accepted on input and stored as text.
    #[serde(
        default,
        rename = "id",
        deserialize_with = "deserialize_track_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub track_id: Option<String>,

    /// Globally unique track identity, for consumers that cannot rely on
    /// per-recording track ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_uuid: Option<Uuid>,
}

impl RoadUserPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            heading: None,
            width: None,
            length: None,
            category: None,
            confidence: None,
            behavior: None,
            track_id: None,
            track_uuid: None,
        }
    }

    pub fn with_track_id(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_size(mut self, width: f64, length: f64) -> Self {
        self.width = Some(width);
        self.length = Some(length);
        self
    }

    #[inline]
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl Observation for RoadUserPoint {
    type EntityId = String;

    fn entity_id(&self) -> Option<String> {
        self.track_id.clone()
    }
}

impl fmt::Display for RoadUserPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RoadUserPoint(x={}, y={}, heading={:?}, width={:?}, length={:?})",
            self.x, self.y, self.heading, self.width, self.length
        )
    }
}

fn deserialize_track_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Integer(value) => value.to_string(),
    }))
}
