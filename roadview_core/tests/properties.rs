//! Randomized operation sequences checked against the store invariants.

use proptest::prelude::*;
use roadview_core::{
    InsertMode, ManagerConfig, Observation, ObservationContainer, Step, TrajectoryManager,
};
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq)]
struct Probe {
    id: Option<u8>,
}

impl Observation for Probe {
    type EntityId = u8;
    fn entity_id(&self) -> Option<u8> {
        self.id
    }
}

#[derive(Debug, Clone)]
enum Op {
    /// Insert relative to the next step (0 = new frame, negative = live frame)
    Add { entity: u8, offset: i64, sorted: bool },
    Batch(Vec<Option<u8>>),
    RemoveTrajectory(u8),
    Evict,
    /// Reconfigure the window (`None` = unbounded)
    SetMaxFrames(Option<usize>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..6, -4i64..=1, any::<bool>())
            .prop_map(|(entity, offset, sorted)| Op::Add { entity, offset, sorted }),
        2 => prop::collection::vec(prop::option::weighted(0.9, 0u8..6), 0..4).prop_map(Op::Batch),
        1 => (0u8..6).prop_map(Op::RemoveTrajectory),
        1 => Just(Op::Evict),
        1 => prop::option::of(1usize..5).prop_map(Op::SetMaxFrames),
    ]
}

type Manager = TrajectoryManager<Probe, i64>;

/// Applies `op`; returns true if it was a successful insert.
fn apply(manager: &mut Manager, op: &Op) -> bool {
    match op {
        Op::Add { entity, offset, sorted } => {
            let step = manager.next_step() + offset;
            let mode = if *sorted { InsertMode::Sorted } else { InsertMode::Append };
            return manager
                .add_object(Probe { id: Some(*entity) }, *entity, step, None, mode)
                .is_ok();
        }
        Op::Batch(ids) => {
            let batch = ids.iter().map(|id| Probe { id: *id }).collect();
            return manager.add_batch_as_new_frame(batch, None).is_ok();
        }
        Op::RemoveTrajectory(entity) => {
            let _ = manager.remove_trajectory(entity);
        }
        Op::Evict => {
            let _ = manager.delete_earliest_frame();
        }
        Op::SetMaxFrames(max_frames) => {
            let before = manager.frame_count();
            let evicted = manager.set_max_frames((*max_frames).and_then(NonZeroUsize::new));
            assert_eq!(before - evicted.len(), manager.frame_count());
        }
    }
    false
}

fn check_invariants(manager: &Manager, max_frames: Option<usize>) -> Result<(), TestCaseError> {
    // Contiguity
    let steps: Vec<Step> = manager.frames().map(|f| f.step()).collect();
    if steps.is_empty() {
        prop_assert_eq!(manager.earliest_step(), -1);
        prop_assert_eq!(manager.last_step(), -1);
    } else {
        let expected: Vec<Step> = (manager.earliest_step()..=manager.last_step()).collect();
        prop_assert_eq!(&steps, &expected);
    }

    // Window bound
    if let Some(max) = max_frames {
        prop_assert!(manager.frame_count() <= max);
    }

    // Frame → trajectory
    let mut frame_members = 0;
    for frame in manager.frames() {
        for key in frame.iter() {
            frame_members += 1;
            let node = manager.node(key).expect("frame key is live");
            prop_assert_eq!(node.frame_step(), Some(frame.step()));
            let id = *node.trajectory_id().expect("routed node has a trajectory");
            let trajectory = manager.trajectory_at(&id).expect("trajectory is registered");
            prop_assert_eq!(trajectory.lookup(frame.step()), Some(key));
            prop_assert_eq!(frame.key_of(&id), Some(key));
        }
    }

    // Trajectory → frame, chain mirrors order
    let mut trajectory_members = 0;
    for trajectory in manager.trajectories() {
        prop_assert!(!trajectory.is_empty());
        let keys: Vec<_> = trajectory.iter().collect();
        trajectory_members += keys.len();

        for (step, key) in trajectory.entries() {
            let frame = manager.frame_at(step).expect("trajectory step is live");
            prop_assert_eq!(frame.key_of(trajectory.id()), Some(key));
        }
        prop_assert!(trajectory.steps().windows(2).all(|w| w[0] < w[1]));

        let forward: Vec<_> = manager.arena().walk_forward(keys[0]).collect();
        prop_assert_eq!(&forward, &keys);
        let mut backward: Vec<_> = manager.arena().walk_backward(keys[keys.len() - 1]).collect();
        backward.reverse();
        prop_assert_eq!(&backward, &keys);
    }

    prop_assert_eq!(frame_members, trajectory_members);
    prop_assert_eq!(frame_members, manager.observation_count());
    Ok(())
}

proptest! {
    #[test]
    fn invariants_hold_for_any_sequence(
        window in prop::option::of(1usize..5),
        ops in prop::collection::vec(op_strategy(), 0..60),
    ) {
        let config = window.map_or_else(ManagerConfig::unbounded, ManagerConfig::windowed);
        let mut manager = Manager::new(config);
        let mut bound = window;
        for op in &ops {
            if let Op::SetMaxFrames(max_frames) = op {
                bound = *max_frames;
            }
            let inserted = apply(&mut manager, op);
            check_invariants(&manager, bound)?;
            if inserted {
                if let Some(max) = bound {
                    prop_assert!(manager.frame_count() <= max);
                }
            }
        }
    }

    #[test]
    fn eviction_removes_whole_step(
        entities in prop::collection::vec(prop::collection::btree_set(0u8..6, 0..6), 1..8),
    ) {
        let mut manager = Manager::with_defaults();
        for frame in &entities {
            let batch = frame.iter().map(|id| Probe { id: Some(*id) }).collect();
            manager.add_batch_as_new_frame(batch, None).unwrap();
        }

        let report = manager.delete_earliest_frame().unwrap();
        prop_assert_eq!(report.step, 0);
        prop_assert_eq!(report.observations.len(), entities[0].len());
        for trajectory in manager.trajectories() {
            prop_assert!(trajectory.lookup(0).is_none());
        }
        for id in &entities[0] {
            let survives = entities[1..].iter().any(|frame| frame.contains(id));
            prop_assert_eq!(manager.trajectory_at(id).is_some(), survives);
            prop_assert_eq!(report.retired_trajectories.contains(id), !survives);
        }
    }
}
