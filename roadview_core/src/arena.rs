//! Observation arena.
//!
//! Observations live in a generational slot map. Trajectories and frames
//! refer to them by [`ObservationKey`], and the temporal chain (`prev`/`next`)
//! plus the back-relations to the owning trajectory and frame are stored as
//! key/id values on the node, so no container ever owns another's data.

use crate::Step;
use slotmap::{new_key_type, SlotMap};
use std::fmt::Debug;
use std::hash::Hash;

new_key_type! {
    /// Stable handle for an observation stored in an [`ObservationArena`].
    pub struct ObservationKey;
}

/// The contract an observation payload must satisfy.
///
/// The store never inspects anything but the identity.
pub trait Observation {
    /// Stable entity identifier (e.g. a track id).
    type EntityId: Clone + Eq + Hash + Ord + Debug;

    /// The entity this observation belongs to, if it is already known.
    fn entity_id(&self) -> Option<Self::EntityId>;
}

/// An observation payload together with its linkage slots.
#[derive(Debug, Clone)]
pub struct ObservationNode<T: Observation> {
    pub(crate) payload: T,
    pub(crate) step: Option<Step>,
    pub(crate) prev: Option<ObservationKey>,
    pub(crate) next: Option<ObservationKey>,
    pub(crate) trajectory: Option<T::EntityId>,
    pub(crate) frame: Option<Step>,
}

impl<T: Observation> ObservationNode<T> {
    fn new(payload: T) -> Self {
        Self {
            payload,
            step: None,
            prev: None,
            next: None,
            trajectory: None,
            frame: None,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Step assigned by the owning trajectory.
    pub fn step(&self) -> Option<Step> {
        self.step
    }

    /// Previous observation of the same entity, in step order.
    pub fn prev(&self) -> Option<ObservationKey> {
        self.prev
    }

    /// Next observation of the same entity, in step order.
    pub fn next(&self) -> Option<ObservationKey> {
        self.next
    }

    /// Id of the owning trajectory, once routed.
    pub fn trajectory_id(&self) -> Option<&T::EntityId> {
        self.trajectory.as_ref()
    }

    /// Step of the owning frame, once routed.
    pub fn frame_step(&self) -> Option<Step> {
        self.frame
    }

    /// The effective identity: the owning trajectory's id once assigned,
    /// the payload's own id before that.
    pub fn entity_id(&self) -> Option<T::EntityId> {
        match &self.trajectory {
            Some(id) => Some(id.clone()),
            None => self.payload.entity_id(),
        }
    }

    /// True when the node is linked into neither a trajectory nor a frame.
    pub fn is_detached(&self) -> bool {
        self.trajectory.is_none() && self.frame.is_none()
    }
}

/// Slot storage for every live observation.
#[derive(Debug, Clone)]
pub struct ObservationArena<T: Observation> {
    nodes: SlotMap<ObservationKey, ObservationNode<T>>,
}

impl<T: Observation> Default for ObservationArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Observation> ObservationArena<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Stores a detached payload and returns its handle.
    pub fn insert(&mut self, payload: T) -> ObservationKey {
        self.nodes.insert(ObservationNode::new(payload))
    }

    /// Drops a node, returning its payload. Callers detach it first.
    pub(crate) fn remove(&mut self, key: ObservationKey) -> Option<T> {
        self.nodes.remove(key).map(|node| node.payload)
    }

    pub fn get(&self, key: ObservationKey) -> Option<&ObservationNode<T>> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: ObservationKey) -> Option<&mut ObservationNode<T>> {
        self.nodes.get_mut(key)
    }

    pub fn payload(&self, key: ObservationKey) -> Option<&T> {
        self.nodes.get(key).map(|node| &node.payload)
    }

    /// Mutable access to the payload only; linkage stays store-managed.
    pub fn payload_mut(&mut self, key: ObservationKey) -> Option<&mut T> {
        self.nodes.get_mut(key).map(|node| &mut node.payload)
    }

    pub fn contains(&self, key: ObservationKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the chain from `start` (inclusive) following `next`.
    pub fn walk_forward(&self, start: ObservationKey) -> ChainWalk<'_, T> {
        ChainWalk {
            arena: self,
            cursor: Some(start),
            direction: Direction::Forward,
        }
    }

    /// Walks the chain from `start` (inclusive) following `prev`.
    pub fn walk_backward(&self, start: ObservationKey) -> ChainWalk<'_, T> {
        ChainWalk {
            arena: self,
            cursor: Some(start),
            direction: Direction::Backward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Iterator over an entity's temporal chain.
pub struct ChainWalk<'a, T: Observation> {
    arena: &'a ObservationArena<T>,
    cursor: Option<ObservationKey>,
    direction: Direction,
}

impl<'a, T: Observation> Iterator for ChainWalk<'a, T> {
    type Item = ObservationKey;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = self.arena.get(key)?;
        self.cursor = match self.direction {
            Direction::Forward => node.next,
            Direction::Backward => node.prev,
        };
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tagged(Option<u32>);

    impl Observation for Tagged {
        type EntityId = u32;
        fn entity_id(&self) -> Option<u32> {
            self.0
        }
    }

    #[test]
    fn test_insert_starts_detached() {
        let mut arena = ObservationArena::new();
        let key = arena.insert(Tagged(Some(7)));

        let node = arena.get(key).unwrap();
        assert!(node.is_detached());
        assert_eq!(node.prev(), None);
        assert_eq!(node.next(), None);
        assert_eq!(node.entity_id(), Some(7));
    }

    #[test]
    fn test_trajectory_id_overrides_payload_id() {
        let mut arena = ObservationArena::new();
        let key = arena.insert(Tagged(None));
        assert_eq!(arena.get(key).unwrap().entity_id(), None);

        arena.get_mut(key).unwrap().trajectory = Some(3);
        assert_eq!(arena.get(key).unwrap().entity_id(), Some(3));
    }

    #[test]
    fn test_stale_key_is_not_reused() {
        let mut arena = ObservationArena::new();
        let old = arena.insert(Tagged(Some(1)));
        assert_eq!(arena.remove(old), Some(Tagged(Some(1))));

        let new = arena.insert(Tagged(Some(2)));
        assert!(!arena.contains(old));
        assert_eq!(arena.payload(new), Some(&Tagged(Some(2))));
        assert_eq!(arena.payload(old), None);
    }

    #[test]
    fn test_walks_follow_links() {
        let mut arena = ObservationArena::new();
        let a = arena.insert(Tagged(Some(1)));
        let b = arena.insert(Tagged(Some(1)));
        let c = arena.insert(Tagged(Some(1)));
        arena.get_mut(a).unwrap().next = Some(b);
        arena.get_mut(b).unwrap().prev = Some(a);
        arena.get_mut(b).unwrap().next = Some(c);
        arena.get_mut(c).unwrap().prev = Some(b);

        assert_eq!(arena.walk_forward(a).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(arena.walk_backward(c).collect::<Vec<_>>(), vec![c, b, a]);
        assert_eq!(arena.walk_forward(b).count(), 2);
    }
}
