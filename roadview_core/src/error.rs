//! Error types for the trajectory store.
//!
//! Every variant is a local validation failure. The structure that raised it
//! has not been mutated, so callers may skip the offending record and carry on.

use crate::Step;

/// Errors that can occur while routing, removing or evicting observations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrajectoryError {
    /// A step is neither the next expected step nor inside the live window.
    #[error("Invalid step {step}: expected {next} or a live step in [{earliest}, {last}]")]
    InvalidStep {
        step: Step,
        earliest: Step,
        last: Step,
        next: Step,
    },

    /// Sorted insertion hit a step the trajectory already holds.
    #[error("Step {0} already exists in trajectory")]
    DuplicateStep(Step),

    /// Removal of a step the trajectory does not hold.
    #[error("Step {0} not found in trajectory")]
    StepNotFound(Step),

    /// Append insertion with a step not after the trajectory's last step.
    #[error("Step {step} is not after the last step {last}; use sorted insertion to fill gaps")]
    OutOfOrderStep { step: Step, last: Step },

    /// The frame already holds an observation for this entity.
    #[error("Entity {0} already exists in the frame")]
    DuplicateEntityInFrame(String),

    /// The frame holds no observation for this entity.
    #[error("Entity {0} does not exist in the frame")]
    EntityNotInFrame(String),

    /// An observation reached a frame without an identity. `index` is the
    /// position inside the rejected batch, when there was one.
    #[error("Observation has no entity id (batch index: {index:?})")]
    MissingEntityId { index: Option<usize> },

    /// A new frame was given a timestamp that already keys a live frame.
    #[error("Timestamp {0} already keys a live frame")]
    DuplicateTimestamp(String),

    #[error("Trajectory not found: {0}")]
    TrajectoryNotFound(String),

    #[error("Observation key is not live in the arena")]
    UnknownObservation,

    /// The observation is already linked into a trajectory or frame.
    #[error("Observation is already linked into a {0}")]
    AlreadyLinked(&'static str),

    #[error("Manager holds no frames")]
    EmptyManager,
}

impl TrajectoryError {
    /// Creates a duplicate-entity error from any debuggable id.
    pub fn duplicate_entity(id: impl std::fmt::Debug) -> Self {
        Self::DuplicateEntityInFrame(format!("{:?}", id))
    }

    /// Creates a missing-entity error from any debuggable id.
    pub fn entity_not_in_frame(id: impl std::fmt::Debug) -> Self {
        Self::EntityNotInFrame(format!("{:?}", id))
    }

    pub fn trajectory_not_found(id: impl std::fmt::Debug) -> Self {
        Self::TrajectoryNotFound(format!("{:?}", id))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = TrajectoryError> = std::result::Result<T, E>;
