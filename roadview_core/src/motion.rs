//! Motion derived from the temporal chain.
//!
//! These helpers only hop to chain neighbors, so each call is O(1) per
//! observation regardless of trajectory length.

use crate::arena::{Observation, ObservationArena, ObservationKey};
use crate::manager::TrajectoryManager;
use crate::road_user::RoadUserPoint;
use nalgebra::Vector2;
use std::fmt::Debug;

/// Payloads with a planar position.
pub trait Planar {
    fn position(&self) -> Vector2<f64>;
}

impl Planar for RoadUserPoint {
    fn position(&self) -> Vector2<f64> {
        RoadUserPoint::position(self)
    }
}

/// Offset from the previous observation of the same entity to `key`.
pub fn displacement<T>(arena: &ObservationArena<T>, key: ObservationKey) -> Option<Vector2<f64>>
where
    T: Observation + Planar,
{
    let node = arena.get(key)?;
    let prev = arena.payload(node.prev()?)?;
    Some(node.payload().position() - prev.position())
}

/// Heading of a displacement in degrees, counter-clockwise from +x.
/// `None` for a zero-length move.
pub fn heading_of(delta: &Vector2<f64>) -> Option<f64> {
    if delta.norm() < f64::EPSILON {
        return None;
    }
    Some(delta.y.atan2(delta.x).to_degrees())
}

/// Velocity per step between `key` and its predecessor.
///
/// Gaps in the trajectory divide the displacement by the step distance.
pub fn velocity_per_step<T, Ts>(manager: &TrajectoryManager<T, Ts>, key: ObservationKey) -> Option<Vector2<f64>>
where
    T: Observation + Planar,
    Ts: Ord + Clone + Debug,
{
    let node = manager.node(key)?;
    let prev_key = node.prev()?;
    let steps = node.step()? - manager.node(prev_key)?.step()?;
    if steps <= 0 {
        return None;
    }
    Some(displacement(manager.arena(), key)? / steps as f64)
}

/// Velocity between `key` and its predecessor, using frame timestamps.
///
/// `seconds_between(earlier, later)` converts the timestamp type into
/// elapsed seconds. Returns `None` when either frame has no timestamp or no
/// time has elapsed.
pub fn velocity<T, Ts, F>(
    manager: &TrajectoryManager<T, Ts>,
    key: ObservationKey,
    seconds_between: F,
) -> Option<Vector2<f64>>
where
    T: Observation + Planar,
    Ts: Ord + Clone + Debug,
    F: Fn(&Ts, &Ts) -> f64,
{
    let prev_key = manager.node(key)?.prev()?;
    let dt = seconds_between(manager.timestamp_of(prev_key)?, manager.timestamp_of(key)?);
    if dt <= 0.0 {
        return None;
    }
    Some(displacement(manager.arena(), key)? / dt)
}

/// Speed between `key` and its predecessor (see [`velocity`]).
pub fn average_speed<T, Ts, F>(
    manager: &TrajectoryManager<T, Ts>,
    key: ObservationKey,
    seconds_between: F,
) -> Option<f64>
where
    T: Observation + Planar,
    Ts: Ord + Clone + Debug,
    F: Fn(&Ts, &Ts) -> f64,
{
    velocity(manager, key, seconds_between).map(|v| v.norm())
}

/// Total distance travelled along the chain starting at `start`.
pub fn path_length<T>(arena: &ObservationArena<T>, start: ObservationKey) -> f64
where
    T: Observation + Planar,
{
    arena
        .walk_forward(start)
        .skip(1)
        .filter_map(|key| displacement(arena, key))
        .map(|delta| delta.norm())
        .sum()
}
