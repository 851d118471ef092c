use thiserror::Error;

use crate::{IntersectionID, MovementID};

/// Every way planning one intersection can fail. None of these affect other intersections.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("{intersection} has malformed input: {reason}")]
    MalformedInput {
        intersection: IntersectionID,
        reason: String,
    },

    #[error("{intersection} has no controllable movement")]
    NoControllableMovement { intersection: IntersectionID },

    #[error("{intersection}: phase sum mismatch, the phases walk {walked}s around a {cycle_length}s cycle")]
    PhaseSumMismatch {
        intersection: IntersectionID,
        walked: f64,
        cycle_length: f64,
    },

    #[error("{intersection} has no reference movement on way 0 or way 1")]
    NoReferenceMovement { intersection: IntersectionID },

    #[error("{intersection} has an infeasible cycle: even after merging, the movements need {required}s of a {cycle_length}s cycle")]
    InfeasibleCycle {
        intersection: IntersectionID,
        required: f64,
        cycle_length: f64,
        /// Pretty JSON of the grouped schedule when merging gave up
        groups: String,
    },

    #[error("{intersection}: phase {movement} overruns the cycle, ending {offset}s after the reference in a {cycle_length}s cycle")]
    PhaseOverrun {
        intersection: IntersectionID,
        movement: MovementID,
        offset: f64,
        cycle_length: f64,
        groups: String,
    },
}

impl SignalError {
    pub fn intersection(&self) -> &IntersectionID {
        match self {
            SignalError::MalformedInput { intersection, .. }
            | SignalError::NoControllableMovement { intersection }
            | SignalError::PhaseSumMismatch { intersection, .. }
            | SignalError::NoReferenceMovement { intersection }
            | SignalError::InfeasibleCycle { intersection, .. }
            | SignalError::PhaseOverrun { intersection, .. } => intersection,
        }
    }

    /// A short stable name, for summaries and file names.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalError::MalformedInput { .. } => "malformed_input",
            SignalError::NoControllableMovement { .. } => "no_controllable_movement",
            SignalError::PhaseSumMismatch { .. } => "phase_sum_mismatch",
            SignalError::NoReferenceMovement { .. } => "no_reference_movement",
            SignalError::InfeasibleCycle { .. } => "infeasible_cycle",
            SignalError::PhaseOverrun { .. } => "phase_overrun",
        }
    }

    /// The grouped schedule at the moment of failure, if the resolver got that far.
    pub fn grouped_state(&self) -> Option<&str> {
        match self {
            SignalError::InfeasibleCycle { groups, .. } | SignalError::PhaseOverrun { groups, .. } => {
                Some(groups)
            }
            _ => None,
        }
    }

    pub(crate) fn malformed<S: Into<String>>(intersection: &IntersectionID, reason: S) -> Self {
        SignalError::MalformedInput {
            intersection: intersection.clone(),
            reason: reason.into(),
        }
    }
}

/// Green time must be a finite, non-negative number of seconds and the cycle a finite, positive
/// one.
pub(crate) fn check_timing(
    intersection: &IntersectionID,
    what: &dyn std::fmt::Display,
    green_time: f64,
    cycle_time: f64,
) -> Result<(), SignalError> {
    if !green_time.is_finite() || green_time < 0.0 {
        return Err(SignalError::malformed(
            intersection,
            format!("{} has green time {}", what, green_time),
        ));
    }
    if !cycle_time.is_finite() || cycle_time <= 0.0 {
        return Err(SignalError::malformed(
            intersection,
            format!("{} has cycle time {}", what, cycle_time),
        ));
    }
    Ok(())
}
