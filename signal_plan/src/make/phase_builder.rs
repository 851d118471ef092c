use std::collections::BTreeMap;

use serde::Serialize;

use traffic_signal_data::{IntersectionTimingRecord, PhaseRecord};

use crate::{
    Approach, IntersectionID, IntersectionSchedule, Movement, MovementID, Phase, PlanOptions,
    Provenance, SignalError,
};

/// A first-draft plan for one intersection: every measured movement placed once around a single
/// cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhasePlan {
    pub intersection: IntersectionID,
    pub cycle_length: f64,
    /// Clearance (yellow) time inserted after every group, in seconds.
    pub clearance: f64,
    pub phases: Vec<Phase>,
}

/// The straight movement and the turning movements of one approach. Turns share a single slot,
/// so the longest of them is what takes up time in the cycle.
#[derive(Default)]
struct ApproachGroups<'a> {
    straight: Option<&'a Movement>,
    turns: Vec<&'a Movement>,
}

impl<'a> ApproachGroups<'a> {
    fn turn_time(&self) -> f64 {
        self.turns.iter().map(|m| m.green_time).fold(0.0, f64::max)
    }

    fn critical_green(&self) -> f64 {
        self.straight.map(|m| m.green_time).unwrap_or(0.0) + self.turn_time()
    }

    fn num_groups(&self) -> usize {
        usize::from(self.straight.is_some()) + usize::from(!self.turns.is_empty())
    }
}

/// Lays out an intersection's measured movements around one cycle. Each approach, in order, gets
/// its straight movement, then all of its turns starting together. Whatever time the greens don't
/// use is split evenly as clearance after every group, so the plan exactly fills the cycle.
pub fn build_phases(
    record: &IntersectionTimingRecord,
    opts: &PlanOptions,
) -> Result<PhasePlan, SignalError> {
    let schedule = schedule_from_record(record)?;
    let id = &schedule.id;

    let mut per_approach: BTreeMap<Approach, ApproachGroups> = BTreeMap::new();
    for m in &schedule.movements {
        let groups = per_approach.entry(m.id.approach).or_default();
        if m.id.direction.is_turn() {
            groups.turns.push(m);
        } else {
            groups.straight = Some(m);
        }
    }

    let critical_green: f64 = per_approach.values().map(|g| g.critical_green()).sum();
    let mut cycle_length = schedule.cycle_length;
    if critical_green > cycle_length {
        debug!(
            "{}: greens need {}s, stretching the {}s cycle",
            id, critical_green, cycle_length
        );
        cycle_length = critical_green;
    }

    let signal_count: usize = per_approach.values().map(|g| g.num_groups()).sum();
    if signal_count == 0 {
        return Err(SignalError::NoControllableMovement {
            intersection: id.clone(),
        });
    }
    let clearance = (cycle_length - critical_green) / (signal_count as f64);

    let mut phases = Vec::new();
    let mut cursor = 0.0;
    for groups in per_approach.values() {
        if let Some(m) = groups.straight {
            phases.push(Phase::scheduled(m, cursor % cycle_length, cycle_length));
            cursor += m.green_time + clearance;
        }
        if !groups.turns.is_empty() {
            let start = cursor % cycle_length;
            for m in &groups.turns {
                phases.push(Phase::scheduled(m, start, cycle_length));
            }
            cursor += groups.turn_time() + clearance;
        }
    }

    if (cursor - cycle_length).abs() > opts.tolerance {
        return Err(SignalError::PhaseSumMismatch {
            intersection: id.clone(),
            walked: cursor,
            cycle_length,
        });
    }

    Ok(PhasePlan {
        intersection: id.clone(),
        cycle_length,
        clearance,
        phases,
    })
}

fn schedule_from_record(
    record: &IntersectionTimingRecord,
) -> Result<IntersectionSchedule, SignalError> {
    let mut movements = Vec::new();
    for (approach, per_dir) in &record.signal_info {
        if per_dir.is_empty() {
            continue;
        }
        let link_ids = record.in_links.get(approach).ok_or_else(|| {
            SignalError::malformed(
                &record.intersection_id,
                format!("{} has timing, but no incoming links", approach),
            )
        })?;
        for (direction, timing) in per_dir {
            movements.push(Movement {
                id: MovementID {
                    approach: *approach,
                    direction: *direction,
                },
                green_time: timing.green_time,
                cycle_time: timing.cycle_time,
                link_ids: link_ids.clone(),
                provenance: Provenance::default(),
            });
        }
    }
    IntersectionSchedule::new(record.intersection_id.clone(), movements)
}

impl PhasePlan {
    /// The plan in the form the conflict resolver reads.
    pub fn to_records(&self) -> Vec<PhaseRecord> {
        self.phases.iter().map(|p| p.to_record()).collect()
    }
}
