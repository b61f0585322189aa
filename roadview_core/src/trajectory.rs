//! Per-entity time series.
//!
//! A [`Trajectory`] keeps one entity's observations strictly ordered by step
//! (gaps allowed) and maintains the `prev`/`next` chain on the arena nodes so
//! that the chain always mirrors the step-ordered sequence.

use crate::arena::{Observation, ObservationArena, ObservationKey};
use crate::container::ObservationContainer;
use crate::error::{Result, TrajectoryError};
use crate::Step;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::trace;

/// How a trajectory accepts a new step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// The step must be after the current last step.
    #[default]
    Append,
    /// The step may land anywhere not already occupied.
    Sorted,
}

/// One entity's ordered history.
#[derive(Debug, Clone)]
pub struct Trajectory<E> {
    id: E,
    steps: Vec<Step>,
    keys: Vec<ObservationKey>,
    by_step: HashMap<Step, ObservationKey>,
}

impl<E: Clone + Eq + Hash + Debug> Trajectory<E> {
    pub fn new(id: E) -> Self {
        Self {
            id,
            steps: Vec::new(),
            keys: Vec::new(),
            by_step: HashMap::new(),
        }
    }

    pub fn id(&self) -> &E {
        &self.id
    }

    /// Steps in ascending order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn first_step(&self) -> Option<Step> {
        self.steps.first().copied()
    }

    pub fn last_step(&self) -> Option<Step> {
        self.steps.last().copied()
    }

    /// Observation at `step`, if any. Absence is not an error here.
    pub fn lookup(&self, step: Step) -> Option<ObservationKey> {
        self.by_step.get(&step).copied()
    }

    pub fn contains_step(&self, step: Step) -> bool {
        self.by_step.contains_key(&step)
    }

    /// Pairs of `(step, key)` in step order.
    pub fn entries(&self) -> impl Iterator<Item = (Step, ObservationKey)> + '_ {
        self.steps.iter().copied().zip(self.keys.iter().copied())
    }

    /// Position at which `step` would be inserted under `mode`.
    ///
    /// Performs no mutation, so callers can validate before touching any
    /// other index.
    pub fn insertion_index(&self, step: Step, mode: InsertMode) -> Result<usize> {
        match mode {
            InsertMode::Append => match self.last_step() {
                Some(last) if step <= last => Err(TrajectoryError::OutOfOrderStep { step, last }),
                _ => Ok(self.steps.len()),
            },
            InsertMode::Sorted => match self.steps.binary_search(&step) {
                Ok(_) => Err(TrajectoryError::DuplicateStep(step)),
                Err(index) => Ok(index),
            },
        }
    }

    /// Links the observation at `key` into this trajectory at `step`.
    ///
    /// Sets the node's step, its trajectory back-relation and rewires the
    /// neighbors on both sides.
    pub fn insert<T>(
        &mut self,
        arena: &mut ObservationArena<T>,
        key: ObservationKey,
        step: Step,
        mode: InsertMode,
    ) -> Result<()>
    where
        T: Observation<EntityId = E>,
    {
        let index = self.insertion_index(step, mode)?;
        match arena.get(key) {
            None => return Err(TrajectoryError::UnknownObservation),
            Some(node) if node.trajectory.is_some() => {
                return Err(TrajectoryError::AlreadyLinked("trajectory"))
            }
            Some(_) => {}
        }

        let prev = index.checked_sub(1).map(|i| self.keys[i]);
        let next = self.keys.get(index).copied();

        self.steps.insert(index, step);
        self.keys.insert(index, key);
        self.by_step.insert(step, key);

        if let Some(node) = arena.get_mut(key) {
            node.step = Some(step);
            node.prev = prev;
            node.next = next;
            node.trajectory = Some(self.id.clone());
        }
        if let Some(prev_node) = prev.and_then(|p| arena.get_mut(p)) {
            prev_node.next = Some(key);
        }
        if let Some(next_node) = next.and_then(|n| arena.get_mut(n)) {
            next_node.prev = Some(key);
        }

        trace!(trajectory = ?self.id, step, index, "observation linked");
        Ok(())
    }

    /// Unlinks the observation at `step` and returns its key.
    ///
    /// The former neighbors are joined directly. The node keeps its payload
    /// and frame back-relation; its step, chain and trajectory slots are
    /// cleared.
    pub fn remove<T>(&mut self, arena: &mut ObservationArena<T>, step: Step) -> Result<ObservationKey>
    where
        T: Observation<EntityId = E>,
    {
        let index = self
            .steps
            .binary_search(&step)
            .map_err(|_| TrajectoryError::StepNotFound(step))?;

        self.steps.remove(index);
        let key = self.keys.remove(index);
        self.by_step.remove(&step);

        let prev = index.checked_sub(1).map(|i| self.keys[i]);
        let next = self.keys.get(index).copied();

        if let Some(prev_node) = prev.and_then(|p| arena.get_mut(p)) {
            prev_node.next = next;
        }
        if let Some(next_node) = next.and_then(|n| arena.get_mut(n)) {
            next_node.prev = prev;
        }
        if let Some(node) = arena.get_mut(key) {
            node.step = None;
            node.prev = None;
            node.next = None;
            node.trajectory = None;
        }

        trace!(trajectory = ?self.id, step, "observation unlinked");
        Ok(key)
    }
}

impl<E> ObservationContainer for Trajectory<E> {
    fn keys(&self) -> &[ObservationKey] {
        &self.keys
    }
}
