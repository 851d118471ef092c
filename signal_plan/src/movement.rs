use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::check_timing;
use crate::{Approach, Direction, IntersectionID, LinkID, SignalError};

/// The atomic schedulable unit: one approach, turning one way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovementID {
    pub approach: Approach,
    pub direction: Direction,
}

impl MovementID {
    pub fn new(approach: usize, direction: Direction) -> MovementID {
        MovementID {
            approach: Approach(approach),
            direction,
        }
    }

    /// Right turns are permissive and never get their own slot in the cycle.
    pub fn is_signalized(&self) -> bool {
        self.direction != Direction::Right
    }
}

impl fmt::Display for MovementID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.approach, self.direction)
    }
}

/// Where a timing measurement came from. Only used to break ties between duplicate
/// measurements; it never makes a schedule more or less legal.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub vehicle_count: usize,
    pub covered_vehicles: usize,
    pub coverage_rate: f64,
    pub data_source: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub id: MovementID,
    /// Seconds
    pub green_time: f64,
    /// The cycle length this movement was measured with, in seconds. Overwritten with the
    /// intersection's shared cycle once the movement joins an `IntersectionSchedule`.
    pub cycle_time: f64,
    pub link_ids: Vec<LinkID>,
    pub provenance: Provenance,
}

/// All of the movements at one intersection, sharing one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionSchedule {
    pub id: IntersectionID,
    /// The longest cycle measured for any movement.
    pub cycle_length: f64,
    pub movements: Vec<Movement>,
}

impl IntersectionSchedule {
    pub fn new(
        id: IntersectionID,
        mut movements: Vec<Movement>,
    ) -> Result<IntersectionSchedule, SignalError> {
        for m in &movements {
            check_timing(&id, &m.id, m.green_time, m.cycle_time)?;
        }
        if movements.is_empty() {
            return Err(SignalError::NoControllableMovement { intersection: id });
        }

        let cycle_length = movements
            .iter()
            .map(|m| m.cycle_time)
            .fold(0.0, f64::max);
        for m in &mut movements {
            m.cycle_time = cycle_length;
        }
        Ok(IntersectionSchedule {
            id,
            cycle_length,
            movements,
        })
    }
}
