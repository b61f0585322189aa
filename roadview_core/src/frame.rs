//! Per-instant snapshots.

use crate::arena::{Observation, ObservationArena, ObservationKey};
use crate::container::ObservationContainer;
use crate::error::{Result, TrajectoryError};
use crate::Step;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// All observations visible at one step, at most one per entity.
///
/// Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct Frame<E, Ts> {
    step: Step,
    timestamp: Option<Ts>,
    keys: Vec<ObservationKey>,
    by_entity: HashMap<E, ObservationKey>,
}

impl<E: Clone + Eq + Hash + Debug, Ts> Frame<E, Ts> {
    pub fn new(step: Step, timestamp: Option<Ts>) -> Self {
        Self {
            step,
            timestamp,
            keys: Vec::new(),
            by_entity: HashMap::new(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn timestamp(&self) -> Option<&Ts> {
        self.timestamp.as_ref()
    }

    /// Key of the observation this frame holds for `entity_id`.
    pub fn key_of(&self, entity_id: &E) -> Option<ObservationKey> {
        self.by_entity.get(entity_id).copied()
    }

    pub fn contains_entity(&self, entity_id: &E) -> bool {
        self.by_entity.contains_key(entity_id)
    }

    /// Entity ids present in this frame (arbitrary order).
    pub fn entity_ids(&self) -> impl Iterator<Item = &E> + '_ {
        self.by_entity.keys()
    }

    /// Checks that `entity_id` could be added without mutating anything.
    pub fn check_add(&self, entity_id: &E) -> Result<()> {
        if self.by_entity.contains_key(entity_id) {
            return Err(TrajectoryError::duplicate_entity(entity_id));
        }
        Ok(())
    }

    /// Adds the observation at `key` and sets its frame back-relation.
    pub fn add<T>(&mut self, arena: &mut ObservationArena<T>, key: ObservationKey) -> Result<()>
    where
        T: Observation<EntityId = E>,
    {
        let node = arena.get(key).ok_or(TrajectoryError::UnknownObservation)?;
        if node.frame.is_some() {
            return Err(TrajectoryError::AlreadyLinked("frame"));
        }
        let entity_id = node
            .entity_id()
            .ok_or(TrajectoryError::MissingEntityId { index: None })?;
        self.check_add(&entity_id)?;

        self.keys.push(key);
        self.by_entity.insert(entity_id, key);
        if let Some(node) = arena.get_mut(key) {
            node.frame = Some(self.step);
        }
        Ok(())
    }

    /// Removes the observation at `key` and clears its frame back-relation.
    pub fn remove<T>(&mut self, arena: &mut ObservationArena<T>, key: ObservationKey) -> Result<()>
    where
        T: Observation<EntityId = E>,
    {
        let Some(index) = self.keys.iter().position(|k| *k == key) else {
            let entity = arena.get(key).and_then(|node| node.entity_id());
            return Err(TrajectoryError::entity_not_in_frame(entity));
        };
        self.keys.remove(index);
        match arena.get(key).and_then(|node| node.entity_id()) {
            Some(entity_id) if self.by_entity.get(&entity_id) == Some(&key) => {
                self.by_entity.remove(&entity_id);
            }
            // Identity changed since the add
            _ => self.by_entity.retain(|_, k| *k != key),
        }
        if let Some(node) = arena.get_mut(key) {
            node.frame = None;
        }
        Ok(())
    }

    /// Removes whatever observation this frame holds for `entity_id`.
    pub fn remove_entity<T>(
        &mut self,
        arena: &mut ObservationArena<T>,
        entity_id: &E,
    ) -> Result<ObservationKey>
    where
        T: Observation<EntityId = E>,
    {
        let key = self
            .key_of(entity_id)
            .ok_or_else(|| TrajectoryError::entity_not_in_frame(entity_id))?;
        self.remove(arena, key)?;
        Ok(key)
    }
}

impl<E, Ts> ObservationContainer for Frame<E, Ts> {
    fn keys(&self) -> &[ObservationKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Detection(Option<u32>);

    impl Observation for Detection {
        type EntityId = u32;
        fn entity_id(&self) -> Option<u32> {
            self.0
        }
    }

    #[test]
    fn test_add_sets_back_relation() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(4, Some(1_000));
        let key = arena.insert(Detection(Some(1)));

        frame.add(&mut arena, key).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.key_of(&1), Some(key));
        assert_eq!(frame.timestamp(), Some(&1_000));
        assert_eq!(arena.get(key).unwrap().frame_step(), Some(4));
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let a = arena.insert(Detection(Some(1)));
        let b = arena.insert(Detection(Some(1)));
        frame.add(&mut arena, a).unwrap();

        let err = frame.add(&mut arena, b).unwrap_err();
        assert!(matches!(err, TrajectoryError::DuplicateEntityInFrame(_)));
        assert_eq!(frame.len(), 1);
        assert_eq!(arena.get(b).unwrap().frame_step(), None);
    }

    #[test]
    fn test_missing_identity_rejected() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let key = arena.insert(Detection(None));

        assert_eq!(
            frame.add(&mut arena, key).unwrap_err(),
            TrajectoryError::MissingEntityId { index: None }
        );
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let keys: Vec<_> = [9, 2, 5]
            .into_iter()
            .map(|id| arena.insert(Detection(Some(id))))
            .collect();
        for key in &keys {
            frame.add(&mut arena, *key).unwrap();
        }
        assert_eq!(frame.iter().collect::<Vec<_>>(), keys);

        frame.remove(&mut arena, keys[1]).unwrap();
        assert_eq!(frame.iter().collect::<Vec<_>>(), vec![keys[0], keys[2]]);
        assert!(!frame.contains_entity(&2));
        assert_eq!(arena.get(keys[1]).unwrap().frame_step(), None);
    }

    #[test]
    fn test_remove_absent() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let key = arena.insert(Detection(Some(3)));

        let err = frame.remove(&mut arena, key).unwrap_err();
        assert_eq!(err, TrajectoryError::EntityNotInFrame("Some(3)".to_string()));
        assert!(frame.remove_entity(&mut arena, &3).is_err());
    }

    #[test]
    fn test_remove_then_readd() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let a = arena.insert(Detection(Some(1)));
        frame.add(&mut arena, a).unwrap();
        assert_eq!(frame.remove_entity(&mut arena, &1).unwrap(), a);

        let b = arena.insert(Detection(Some(1)));
        frame.add(&mut arena, b).unwrap();
        assert_eq!(frame.key_of(&1), Some(b));
    }

    #[test]
    fn test_remove_keeps_other_entities() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let keys: Vec<_> = (1..=3).map(|id| arena.insert(Detection(Some(id)))).collect();
        for key in &keys {
            frame.add(&mut arena, *key).unwrap();
        }

        frame.remove(&mut arena, keys[1]).unwrap();
        assert_eq!(frame.key_of(&1), Some(keys[0]));
        assert_eq!(frame.key_of(&2), None);
        assert_eq!(frame.key_of(&3), Some(keys[2]));
        assert_eq!(frame.iter().collect::<Vec<_>>(), vec![keys[0], keys[2]]);
        assert_eq!(arena.get(keys[1]).unwrap().frame_step(), None);
    }

    #[test]
    fn test_remove_after_payload_id_changed() {
        let mut arena = ObservationArena::new();
        let mut frame: Frame<u32, i64> = Frame::new(0, None);
        let key = arena.insert(Detection(Some(1)));
        frame.add(&mut arena, key).unwrap();

        arena.payload_mut(key).unwrap().0 = Some(9);
        frame.remove(&mut arena, key).unwrap();
        assert!(frame.is_empty());
        assert!(!frame.contains_entity(&1));
    }
}
