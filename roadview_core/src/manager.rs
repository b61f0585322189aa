//! The multi-index store.
//!
//! [`TrajectoryManager`] owns the observation arena, every trajectory and every
//! frame. It routes each observation into exactly one trajectory and exactly
//! one frame and keeps the step, timestamp and entity indices in sync:
//!
//! 1. Step validation (next step creates a frame, live steps reuse one)
//! 2. Pre-checks on both views, so a rejected insert mutates nothing
//! 3. Linking into the trajectory chain and the frame membership
//! 4. Window enforcement (oldest-first eviction with cascading cleanup)

use crate::arena::{Observation, ObservationArena, ObservationKey, ObservationNode};
use crate::config::ManagerConfig;
use crate::container::ObservationContainer;
use crate::error::{Result, TrajectoryError};
use crate::frame::Frame;
use crate::trajectory::{InsertMode, Trajectory};
use crate::Step;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::num::NonZeroUsize;
use tracing::{debug, trace, warn};

/// Report of one evicted frame.
#[derive(Debug, Clone)]
pub struct EvictedFrame<T: Observation, Ts> {
    pub step: Step,
    pub timestamp: Option<Ts>,
    /// Payloads that left the store, in frame order.
    pub observations: Vec<T>,
    /// Trajectories retired because the eviction emptied them (sorted).
    pub retired_trajectories: Vec<T::EntityId>,
}

/// Windowed store of trajectories and frames.
pub struct TrajectoryManager<T: Observation, Ts = i64> {
    // === Observation Store ===
    arena: ObservationArena<T>,

    // === Views ===
    /// Live trajectories keyed by entity id
    trajectories: HashMap<T::EntityId, Trajectory<T::EntityId>>,

    /// Live frames; steps are contiguous from the front
    frames: VecDeque<Frame<T::EntityId, Ts>>,

    /// Timestamp → step for frames that carry one
    timestamp_index: BTreeMap<Ts, Step>,

    // === Configuration ===
    config: ManagerConfig,

    /// Frames evicted since creation
    evicted_total: u64,
}

impl<T, Ts> TrajectoryManager<T, Ts>
where
    T: Observation,
    Ts: Ord + Clone + Debug,
{
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            arena: ObservationArena::new(),
            trajectories: HashMap::new(),
            frames: VecDeque::new(),
            timestamp_index: BTreeMap::new(),
            config,
            evicted_total: 0,
        }
    }

    /// Unbounded manager.
    pub fn with_defaults() -> Self {
        Self::new(ManagerConfig::default())
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Changes the window bound and evicts down to it right away.
    /// Returns the evicted frames, oldest first.
    pub fn set_max_frames(
        &mut self,
        max_frames: Option<NonZeroUsize>,
    ) -> Vec<EvictedFrame<T, Ts>> {
        self.config.max_frames = max_frames;
        self.enforce_window()
    }

    // ========================================================================
    // STEP WINDOW
    // ========================================================================

    /// Smallest live step, or -1 if there are no frames.
    pub fn earliest_step(&self) -> Step {
        self.frames.front().map_or(-1, |f| f.step())
    }

    /// Largest live step, or -1 if there are no frames.
    pub fn last_step(&self) -> Step {
        self.frames.back().map_or(-1, |f| f.step())
    }

    /// The only step at which a new frame may be created.
    pub fn next_step(&self) -> Step {
        self.last_step() + 1
    }

    fn frame_index(&self, step: Step) -> Option<usize> {
        let earliest = self.frames.front()?.step();
        let offset = usize::try_from(step.checked_sub(earliest)?).ok()?;
        (offset < self.frames.len()).then_some(offset)
    }

    /// Returns true if `step` needs a new frame, false if it reuses a live one.
    fn resolve_step(&self, step: Step) -> Result<bool> {
        if step == self.next_step() {
            return Ok(true);
        }
        if self.frame_index(step).is_some() {
            return Ok(false);
        }
        Err(TrajectoryError::InvalidStep {
            step,
            earliest: self.earliest_step(),
            last: self.last_step(),
            next: self.next_step(),
        })
    }

    fn check_new_timestamp(&self, timestamp: Option<&Ts>) -> Result<()> {
        match timestamp {
            Some(ts) if self.timestamp_index.contains_key(ts) => {
                Err(TrajectoryError::DuplicateTimestamp(format!("{:?}", ts)))
            }
            _ => Ok(()),
        }
    }

    fn push_frame(&mut self, step: Step, timestamp: Option<Ts>) {
        if let Some(ts) = &timestamp {
            self.timestamp_index.insert(ts.clone(), step);
        }
        debug!(step, timestamp = ?timestamp, "frame created");
        self.frames.push_back(Frame::new(step, timestamp));
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Links a validated observation into its trajectory and the frame at
    /// `step`. Both views have already been checked by the caller.
    fn link(
        &mut self,
        payload: T,
        entity_id: T::EntityId,
        step: Step,
        mode: InsertMode,
    ) -> Result<ObservationKey> {
        let index = self.frame_index(step).ok_or(TrajectoryError::InvalidStep {
            step,
            earliest: self.earliest_step(),
            last: self.last_step(),
            next: self.next_step(),
        })?;
        let key = self.arena.insert(payload);

        let trajectory = self.trajectories.entry(entity_id.clone()).or_insert_with(|| {
            debug!(entity = ?entity_id, step, "trajectory created");
            Trajectory::new(entity_id.clone())
        });
        trajectory.insert(&mut self.arena, key, step, mode)?;
        self.frames[index].add(&mut self.arena, key)?;

        trace!(entity = ?entity_id, step, "observation routed");
        Ok(key)
    }

    /// Routes one observation into the trajectory for `entity_id` and the
    /// frame at `step`.
    ///
    /// `step` must be a live step or exactly `last_step() + 1`, which creates
    /// a new frame (keyed by `timestamp` when given; the timestamp is ignored
    /// for existing frames). Nothing is mutated if either view rejects the
    /// observation. Creating a frame may evict the oldest ones to honor the
    /// window bound.
    pub fn add_object(
        &mut self,
        payload: T,
        entity_id: T::EntityId,
        step: Step,
        timestamp: Option<Ts>,
        mode: InsertMode,
    ) -> Result<ObservationKey> {
        let creates_frame = self.resolve_step(step)?;

        if creates_frame {
            self.check_new_timestamp(timestamp.as_ref())?;
        } else if let Some(frame) = self.frame_index(step).map(|i| &self.frames[i]) {
            frame.check_add(&entity_id)?;
        }
        if let Some(trajectory) = self.trajectories.get(&entity_id) {
            trajectory.insertion_index(step, mode)?;
        }

        if creates_frame {
            self.push_frame(step, timestamp);
        }
        let key = self.link(payload, entity_id, step, mode)?;

        if creates_frame {
            self.enforce_window();
        }
        Ok(key)
    }

    /// Creates one frame at `last_step() + 1` holding every observation of
    /// the batch, each routed by its own entity id.
    ///
    /// The batch is validated as a whole first: a missing or repeated entity
    /// id rejects it without creating the frame.
    pub fn add_batch_as_new_frame(
        &mut self,
        observations: Vec<T>,
        timestamp: Option<Ts>,
    ) -> Result<Vec<ObservationKey>> {
        let mut seen = HashSet::with_capacity(observations.len());
        let mut entity_ids = Vec::with_capacity(observations.len());
        for (index, observation) in observations.iter().enumerate() {
            let entity_id = observation
                .entity_id()
                .ok_or(TrajectoryError::MissingEntityId { index: Some(index) })?;
            if !seen.insert(entity_id.clone()) {
                return Err(TrajectoryError::duplicate_entity(&entity_id));
            }
            entity_ids.push(entity_id);
        }
        self.check_new_timestamp(timestamp.as_ref())?;

        let step = self.next_step();
        self.push_frame(step, timestamp);

        // Every live trajectory ends at or before the previous step, so
        // appending at the new step cannot fail ordering checks.
        let keys = observations
            .into_iter()
            .zip(entity_ids)
            .map(|(payload, entity_id)| self.link(payload, entity_id, step, InsertMode::Append))
            .collect::<Result<Vec<_>>>()?;

        self.enforce_window();
        Ok(keys)
    }

    // ========================================================================
    // REMOVAL & EVICTION
    // ========================================================================

    /// Removes a trajectory and all its observations from their frames.
    ///
    /// Frames are kept even if they become empty. Returns the removed
    /// payloads in step order.
    pub fn remove_trajectory(&mut self, entity_id: &T::EntityId) -> Result<Vec<T>> {
        let trajectory = self
            .trajectories
            .remove(entity_id)
            .ok_or_else(|| TrajectoryError::trajectory_not_found(entity_id))?;

        let mut payloads = Vec::with_capacity(trajectory.len());
        for (step, key) in trajectory.entries() {
            if let Some(index) = self.frame_index(step) {
                if let Err(e) = self.frames[index].remove(&mut self.arena, key) {
                    warn!(entity = ?entity_id, step, error = %e, "frame out of sync with trajectory");
                }
            }
            if let Some(payload) = self.arena.remove(key) {
                payloads.push(payload);
            }
        }

        debug!(entity = ?entity_id, observations = payloads.len(), "trajectory removed");
        Ok(payloads)
    }

    /// Evicts the frame with the smallest live step.
    ///
    /// Each of its observations is unlinked from its trajectory (joining the
    /// chain around it) and dropped from the arena; trajectories left empty
    /// are retired.
    pub fn delete_earliest_frame(&mut self) -> Result<EvictedFrame<T, Ts>> {
        let frame = self.frames.pop_front().ok_or(TrajectoryError::EmptyManager)?;
        let step = frame.step();

        let mut observations = Vec::with_capacity(frame.len());
        for key in frame.iter() {
            let owner = self.arena.get(key).and_then(|node| node.trajectory.clone());
            if let Some(trajectory) = owner.as_ref().and_then(|id| self.trajectories.get_mut(id)) {
                if let Err(e) = trajectory.remove(&mut self.arena, step) {
                    warn!(entity = ?owner, step, error = %e, "trajectory out of sync with frame");
                }
            }
            if let Some(payload) = self.arena.remove(key) {
                observations.push(payload);
            }
        }

        if let Some(ts) = frame.timestamp() {
            self.timestamp_index.remove(ts);
        }

        let mut retired_trajectories: Vec<T::EntityId> = self
            .trajectories
            .iter()
            .filter(|(_, trajectory)| trajectory.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        retired_trajectories.sort();
        for id in &retired_trajectories {
            self.trajectories.remove(id);
        }

        self.evicted_total += 1;
        debug!(
            step,
            observations = observations.len(),
            retired = retired_trajectories.len(),
            "frame evicted"
        );

        Ok(EvictedFrame {
            step,
            timestamp: frame.timestamp().cloned(),
            observations,
            retired_trajectories,
        })
    }

    /// Evicts oldest frames until the configured bound holds.
    pub fn enforce_window(&mut self) -> Vec<EvictedFrame<T, Ts>> {
        let mut evicted = Vec::new();
        while self.config.exceeds(self.frames.len()) {
            match self.delete_earliest_frame() {
                Ok(report) => evicted.push(report),
                Err(_) => break,
            }
        }
        evicted
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Frame with the largest live step.
    pub fn last_frame(&self) -> Result<&Frame<T::EntityId, Ts>> {
        self.frames.back().ok_or(TrajectoryError::EmptyManager)
    }

    pub fn frame_at(&self, step: Step) -> Option<&Frame<T::EntityId, Ts>> {
        self.frame_index(step).map(|i| &self.frames[i])
    }

    pub fn frame_at_timestamp(&self, timestamp: &Ts) -> Option<&Frame<T::EntityId, Ts>> {
        let step = *self.timestamp_index.get(timestamp)?;
        self.frame_at(step)
    }

    pub fn trajectory_at(&self, entity_id: &T::EntityId) -> Option<&Trajectory<T::EntityId>> {
        self.trajectories.get(entity_id)
    }

    /// Live frames in ascending step order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame<T::EntityId, Ts>> {
        self.frames.iter()
    }

    /// Live trajectories in arbitrary order.
    pub fn trajectories(&self) -> impl Iterator<Item = &Trajectory<T::EntityId>> {
        self.trajectories.values()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn trajectory_count(&self) -> usize {
        self.trajectories.len()
    }

    /// Number of live observations.
    pub fn observation_count(&self) -> usize {
        self.arena.len()
    }

    /// Frames evicted since this manager was created.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    pub fn arena(&self) -> &ObservationArena<T> {
        &self.arena
    }

    pub fn node(&self, key: ObservationKey) -> Option<&ObservationNode<T>> {
        self.arena.get(key)
    }

    pub fn observation(&self, key: ObservationKey) -> Option<&T> {
        self.arena.payload(key)
    }

    pub fn observation_mut(&mut self, key: ObservationKey) -> Option<&mut T> {
        self.arena.payload_mut(key)
    }

    /// Step of the frame currently holding `key`.
    pub fn step_of(&self, key: ObservationKey) -> Option<Step> {
        self.arena.get(key)?.frame_step()
    }

    /// Timestamp of the frame currently holding `key`.
    pub fn timestamp_of(&self, key: ObservationKey) -> Option<&Ts> {
        self.frame_at(self.step_of(key)?)?.timestamp()
    }

    /// Up to `max_len` keys of the same entity ending at `key`, oldest first.
    pub fn trail(&self, key: ObservationKey, max_len: usize) -> Vec<ObservationKey> {
        let mut trail: Vec<_> = self.arena.walk_backward(key).take(max_len).collect();
        trail.reverse();
        trail
    }
}

impl<T, Ts> Default for TrajectoryManager<T, Ts>
where
    T: Observation,
    Ts: Ord + Clone + Debug,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================
