use serde::{Deserialize, Serialize};

use traffic_signal_data::PhaseRecord;

use crate::{LinkID, Movement, MovementID, Provenance};

/// A movement placed in the cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub movement: MovementID,
    /// Seconds after the start of the cycle when this movement turns green, in
    /// `[0, cycle_length)`.
    pub green_start: f64,
    pub green_time: f64,
    pub cycle_length: f64,
    pub link_ids: Vec<LinkID>,
    pub provenance: Provenance,
}

impl Phase {
    pub fn scheduled(movement: &Movement, green_start: f64, cycle_length: f64) -> Phase {
        Phase {
            movement: movement.id,
            green_start,
            green_time: movement.green_time,
            cycle_length,
            link_ids: movement.link_ids.clone(),
            provenance: movement.provenance.clone(),
        }
    }

    pub fn interval(&self) -> GreenInterval {
        GreenInterval {
            start: self.green_start,
            duration: self.green_time,
            cycle_length: self.cycle_length,
        }
    }

    pub fn from_record(record: &PhaseRecord) -> Phase {
        Phase {
            movement: MovementID {
                approach: record.approach,
                direction: record.direction,
            },
            green_start: record.green_start,
            green_time: record.green_time,
            cycle_length: record.cycle_length,
            link_ids: record.link_ids.clone(),
            provenance: Provenance {
                vehicle_count: record.vehicle_count,
                covered_vehicles: record.covered_vehicles,
                coverage_rate: record.coverage_rate,
                data_source: record.data_source.clone(),
            },
        }
    }

    pub fn to_record(&self) -> PhaseRecord {
        PhaseRecord {
            approach: self.movement.approach,
            direction: self.movement.direction,
            cycle_length: self.cycle_length,
            green_start: self.green_start,
            green_time: self.green_time,
            link_ids: self.link_ids.clone(),
            vehicle_count: self.provenance.vehicle_count,
            covered_vehicles: self.provenance.covered_vehicles,
            coverage_rate: self.provenance.coverage_rate,
            data_source: self.provenance.data_source.clone(),
        }
    }
}

/// A green period `[start, start + duration)` on a circular clock of `cycle_length` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GreenInterval {
    pub start: f64,
    pub duration: f64,
    pub cycle_length: f64,
}

impl GreenInterval {
    pub fn is_empty(&self) -> bool {
        self.duration <= 0.0
    }

    /// Is the light green at this time? The time may be outside `[0, cycle_length)`.
    pub fn contains(&self, time: f64) -> bool {
        if self.is_empty() {
            return false;
        }
        if self.duration >= self.cycle_length {
            return true;
        }
        (time - self.start).rem_euclid(self.cycle_length) < self.duration
    }

    /// Two arcs on the same circle overlap exactly when one of them starts inside the other. An
    /// empty green contains nothing, but still overlaps a green it starts inside.
    pub fn overlaps(&self, other: &GreenInterval) -> bool {
        self.contains(other.start) || other.contains(self.start)
    }

    /// The interval as `(start, length)` pieces that don't cross the end of the cycle, for
    /// drawing. A wrapping interval becomes two pieces, the second starting at 0.
    pub fn segments(&self) -> Vec<(f64, f64)> {
        if self.is_empty() {
            return Vec::new();
        }
        let start = wrap_time(self.start, self.cycle_length);
        let duration = self.duration.min(self.cycle_length);
        let end = start + duration;
        if end <= self.cycle_length {
            vec![(start, duration)]
        } else {
            let first = self.cycle_length - start;
            vec![(start, first), (0.0, duration - first)]
        }
    }
}

/// Wraps any time onto the cycle, in `[0, cycle_length)`. `rem_euclid` alone rounds a tiny
/// negative time up to exactly `cycle_length`.
pub(crate) fn wrap_time(time: f64, cycle_length: f64) -> f64 {
    let wrapped = time.rem_euclid(cycle_length);
    if wrapped >= cycle_length {
        0.0
    } else {
        wrapped
    }
}

/// The phase builder's output convention: how long before the end of the cycle a light turns
/// green. A forward offset `x` (seconds after the cycle starts) is stored as
/// `(cycle_length - x) mod cycle_length`. Only ever construct or read this through
/// `from_forward` and `to_forward`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackwardOffset(f64);

impl BackwardOffset {
    pub fn from_forward(forward: f64, cycle_length: f64) -> BackwardOffset {
        BackwardOffset(wrap_time(cycle_length - forward, cycle_length))
    }

    /// Read a value written by someone else, like the `initial_phase` of a `Light`.
    pub fn raw(value: f64) -> BackwardOffset {
        BackwardOffset(value)
    }

    pub fn to_forward(self, cycle_length: f64) -> f64 {
        wrap_time(cycle_length - self.0, cycle_length)
    }

    pub fn inner_seconds(self) -> f64 {
        self.0
    }
}
