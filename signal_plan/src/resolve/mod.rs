mod detect;
mod groups;
mod merge;

use std::collections::BTreeMap;

use traffic_signal_data::PhaseRecord;

pub use self::detect::detect_conflicts;
pub use self::groups::MovementGroups;
pub use self::merge::{MergeStep, FALLBACK_ORDER};
use crate::error::check_timing;
use crate::phase::wrap_time;
use crate::{
    Approach, ConflictTable, Direction, IntersectionID, MovementID, Phase, PlanOptions,
    SignalError, EPSILON,
};

/// Re-times an intersection's phases so that no two conflicting movements are green at once.
pub struct ConflictResolver<'a> {
    table: &'a ConflictTable,
    clearance: f64,
    always_resolve: bool,
}

/// The outcome of resolving one intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub intersection: IntersectionID,
    pub cycle_length: f64,
    /// Same length and order as the input.
    pub phases: Vec<Phase>,
    /// Merges that actually happened, in order.
    pub merges: Vec<MergeStep>,
    /// For every phase, the slot it was scheduled in. Right turns aren't scheduled and keep their
    /// measured start.
    pub slots: Vec<Option<MovementID>>,
    /// How many conflicting pairs the input had.
    pub conflicts_before: usize,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(table: &'a ConflictTable, opts: &PlanOptions) -> ConflictResolver<'a> {
        ConflictResolver {
            table,
            clearance: opts.clearance_seconds,
            always_resolve: opts.always_resolve,
        }
    }

    /// Finds conflicting pairs in the input as-is, after putting every phase on the longest cycle.
    pub fn detect(
        &self,
        id: &IntersectionID,
        phases: &[Phase],
    ) -> Result<Vec<(usize, usize)>, SignalError> {
        let (_, phases) = coerce_cycle(id, phases)?;
        Ok(detect_conflicts(&phases, self.table))
    }

    /// Like `resolve`, but an intersection without any conflicts is only put on a common cycle.
    pub fn resolve_if_needed(
        &self,
        id: &IntersectionID,
        phases: &[Phase],
    ) -> Result<Resolution, SignalError> {
        let (cycle_length, coerced) = coerce_cycle(id, phases)?;
        if self.always_resolve || !detect_conflicts(&coerced, self.table).is_empty() {
            return self.resolve(id, phases);
        }
        debug!("{} has no conflicts, leaving it alone", id);
        let groups = MovementGroups::new(&coerced);
        Ok(Resolution {
            intersection: id.clone(),
            cycle_length,
            slots: (0..coerced.len()).map(|idx| groups.slot_of(idx)).collect(),
            phases: coerced,
            merges: Vec::new(),
            conflicts_before: 0,
        })
    }

    /// Rebuilds the schedule from scratch. Repeated measurements of one movement collapse to the
    /// best-observed one, slots are merged until they fit the cycle, and then every slot is laid
    /// out in order starting from the reference movement's green.
    pub fn resolve(
        &self,
        id: &IntersectionID,
        phases: &[Phase],
    ) -> Result<Resolution, SignalError> {
        let (cycle_length, phases) = coerce_cycle(id, phases)?;
        let conflicts_before = detect_conflicts(&phases, self.table).len();
        let phases = deduplicate(phases);

        let reference = find_reference(&phases).ok_or_else(|| SignalError::NoReferenceMovement {
            intersection: id.clone(),
        })?;
        let reference_start = phases[reference].green_start;

        let groups = MovementGroups::new(&phases);
        let (groups, merges) = merge::fit_to_cycle(groups, &phases, cycle_length, self.clearance);
        for step in &merges {
            debug!("{}: merged {}", id, step);
        }
        let required = groups.critical_time(&phases, self.clearance);
        if required > cycle_length {
            return Err(SignalError::InfeasibleCycle {
                intersection: id.clone(),
                required,
                cycle_length,
                groups: groups.dump(&phases),
            });
        }

        let starts = self.lay_out(id, &groups, &phases, reference_start, cycle_length)?;

        let slots = (0..phases.len()).map(|idx| groups.slot_of(idx)).collect();
        let phases = phases
            .into_iter()
            .enumerate()
            .map(|(idx, phase)| Phase {
                green_start: starts.get(&idx).cloned().unwrap_or(phase.green_start),
                ..phase
            })
            .collect();
        Ok(Resolution {
            intersection: id.clone(),
            cycle_length,
            phases,
            merges,
            slots,
            conflicts_before,
        })
    }
}

impl<'a> ConflictResolver<'a> {
    /// Walks the slots in order from the reference movement's start, giving every member of a
    /// slot the same start. Returns the start of every scheduled phase, by index.
    fn lay_out(
        &self,
        id: &IntersectionID,
        groups: &MovementGroups,
        phases: &[Phase],
        reference_start: f64,
        cycle_length: f64,
    ) -> Result<BTreeMap<usize, f64>, SignalError> {
        let mut starts: BTreeMap<usize, f64> = BTreeMap::new();
        let mut cursor = reference_start;
        for (slot, members) in groups.iter() {
            let start = wrap_time(cursor, cycle_length);
            for idx in members {
                starts.insert(*idx, start);
            }
            cursor += MovementGroups::slot_time(members, phases) + self.clearance;
            // Groups that fit the cycle never get here, short of float drift in the sums
            if cursor - reference_start > cycle_length + EPSILON {
                return Err(SignalError::PhaseOverrun {
                    intersection: id.clone(),
                    movement: slot,
                    offset: cursor - reference_start,
                    cycle_length,
                    groups: groups.dump(phases),
                });
            }
        }
        Ok(starts)
    }
}

impl Resolution {
    /// Conflicting pairs that are still green together. Phases merged into one slot go green
    /// together on purpose and don't count.
    pub fn remaining_conflicts(&self, table: &ConflictTable) -> Vec<(usize, usize)> {
        detect_conflicts(&self.phases, table)
            .into_iter()
            .filter(|(idx1, idx2)| {
                self.slots[*idx1].is_none() || self.slots[*idx1] != self.slots[*idx2]
            })
            .collect()
    }

    pub fn to_records(&self) -> Vec<PhaseRecord> {
        self.phases.iter().map(|p| p.to_record()).collect()
    }
}

/// Validates the phases and puts all of them on the longest cycle any of them uses, with starts
/// wrapped into `[0, cycle_length)`.
fn coerce_cycle(id: &IntersectionID, phases: &[Phase]) -> Result<(f64, Vec<Phase>), SignalError> {
    if phases.is_empty() {
        return Err(SignalError::NoControllableMovement {
            intersection: id.clone(),
        });
    }
    for phase in phases {
        check_timing(id, &phase.movement, phase.green_time, phase.cycle_length)?;
        if !phase.green_start.is_finite() {
            return Err(SignalError::malformed(
                id,
                format!("{} starts at {}", phase.movement, phase.green_start),
            ));
        }
    }
    let cycle_length = phases
        .iter()
        .map(|p| p.cycle_length)
        .fold(0.0, f64::max);
    let phases = phases
        .iter()
        .map(|p| Phase {
            green_start: wrap_time(p.green_start, cycle_length),
            cycle_length,
            ..p.clone()
        })
        .collect();
    Ok((cycle_length, phases))
}

/// Every phase of a movement takes the start and green time of that movement's best-observed
/// phase, the one with the most vehicles. Ties go to whichever came first.
fn deduplicate(phases: Vec<Phase>) -> Vec<Phase> {
    let mut best: BTreeMap<MovementID, usize> = BTreeMap::new();
    for (idx, phase) in phases.iter().enumerate() {
        let current = best.entry(phase.movement).or_insert(idx);
        if phase.provenance.vehicle_count > phases[*current].provenance.vehicle_count {
            *current = idx;
        }
    }
    phases
        .iter()
        .map(|phase| {
            let winner = &phases[best[&phase.movement]];
            Phase {
                green_start: winner.green_start,
                green_time: winner.green_time,
                ..phase.clone()
            }
        })
        .collect()
}

/// The phase everything else is timed from: way 0's straight movement if there is one, otherwise
/// the busiest phase of the first direction present on way 0, then on way 1.
fn find_reference(phases: &[Phase]) -> Option<usize> {
    let main = MovementID::new(0, Direction::Straight);
    if let Some(idx) = phases.iter().position(|p| p.movement == main) {
        return Some(idx);
    }
    for approach in [0, 1] {
        for direction in [Direction::Straight, Direction::Left, Direction::UTurn] {
            let movement = MovementID {
                approach: Approach(approach),
                direction,
            };
            let mut best: Option<usize> = None;
            for (idx, phase) in phases.iter().enumerate() {
                if phase.movement != movement {
                    continue;
                }
                match best {
                    Some(b)
                        if phases[b].provenance.vehicle_count
                            >= phase.provenance.vehicle_count => {}
                    _ => {
                        best = Some(idx);
                    }
                }
            }
            if best.is_some() {
                return best;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provenance;

    fn phase(approach: usize, direction: Direction, start: f64, green: f64, cycle: f64) -> Phase {
        Phase {
            movement: MovementID::new(approach, direction),
            green_start: start,
            green_time: green,
            cycle_length: cycle,
            link_ids: Vec::new(),
            provenance: Provenance::default(),
        }
    }

    fn counted(mut p: Phase, vehicle_count: usize) -> Phase {
        p.provenance.vehicle_count = vehicle_count;
        p
    }

    fn starts(resolution: &Resolution) -> Vec<f64> {
        resolution.phases.iter().map(|p| p.green_start).collect()
    }

    #[test]
    fn cycles_are_coerced_and_wrapped() {
        let id = IntersectionID::from("i");
        let (cycle, phases) = coerce_cycle(
            &id,
            &[
                phase(0, Direction::Straight, 70.0, 20.0, 60.0),
                phase(1, Direction::Straight, -5.0, 20.0, 90.0),
            ],
        )
        .unwrap();
        assert_eq!(cycle, 90.0);
        assert_eq!(phases[0].green_start, 70.0);
        assert_eq!(phases[1].green_start, 85.0);
        assert!(phases.iter().all(|p| p.cycle_length == 90.0));

        let (_, phases) =
            coerce_cycle(&id, &[phase(0, Direction::Straight, -1e-20, 20.0, 60.0)]).unwrap();
        assert_eq!(phases[0].green_start, 0.0);

        assert_eq!(
            coerce_cycle(&id, &[]).unwrap_err().kind(),
            "no_controllable_movement"
        );
        assert_eq!(
            coerce_cycle(&id, &[phase(0, Direction::Left, f64::NAN, 20.0, 60.0)])
                .unwrap_err()
                .kind(),
            "malformed_input"
        );
    }

    #[test]
    fn busiest_duplicate_wins() {
        let phases = deduplicate(vec![
            counted(phase(0, Direction::Left, 10.0, 12.0, 60.0), 5),
            counted(phase(0, Direction::Left, 30.0, 18.0, 60.0), 9),
            counted(phase(0, Direction::Left, 40.0, 25.0, 60.0), 9),
            counted(phase(0, Direction::Straight, 0.0, 20.0, 60.0), 3),
        ]);
        for p in &phases[0..3] {
            assert_eq!((p.green_start, p.green_time), (30.0, 18.0));
        }
        // Provenance is per observation and survives
        assert_eq!(phases[0].provenance.vehicle_count, 5);
        assert_eq!(phases[3].green_time, 20.0);
    }

    #[test]
    fn reference_fallbacks() {
        let with_main = vec![
            phase(1, Direction::Straight, 0.0, 20.0, 60.0),
            phase(0, Direction::Straight, 5.0, 20.0, 60.0),
        ];
        assert_eq!(find_reference(&with_main), Some(1));

        let turns_only = vec![
            counted(phase(0, Direction::UTurn, 0.0, 10.0, 60.0), 50),
            counted(phase(0, Direction::Left, 5.0, 10.0, 60.0), 2),
            counted(phase(0, Direction::Left, 9.0, 10.0, 60.0), 7),
        ];
        assert_eq!(find_reference(&turns_only), Some(2));

        let second_way = vec![
            phase(0, Direction::Right, 0.0, 10.0, 60.0),
            phase(2, Direction::Straight, 0.0, 10.0, 60.0),
            phase(1, Direction::UTurn, 3.0, 10.0, 60.0),
        ];
        assert_eq!(find_reference(&second_way), Some(2));

        let nothing = vec![phase(2, Direction::Straight, 0.0, 10.0, 60.0)];
        assert_eq!(find_reference(&nothing), None);
    }

    #[test]
    fn no_reference_movement() {
        let table = ConflictTable::two_way();
        let resolver = ConflictResolver::new(&table, &PlanOptions::default());
        let err = resolver
            .resolve(
                &IntersectionID::from("i"),
                &[
                    phase(0, Direction::Right, 0.0, 10.0, 60.0),
                    phase(3, Direction::Straight, 0.0, 10.0, 60.0),
                ],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "no_reference_movement");
    }

    #[test]
    fn slots_follow_the_reference() {
        let table = ConflictTable::two_way();
        let resolver = ConflictResolver::new(&table, &PlanOptions::default());
        let resolution = resolver
            .resolve(
                &IntersectionID::from("i"),
                &[
                    phase(1, Direction::Straight, 0.0, 20.0, 60.0),
                    phase(0, Direction::Right, 44.0, 30.0, 60.0),
                    phase(0, Direction::Left, 0.0, 10.0, 60.0),
                    phase(0, Direction::Straight, 50.0, 15.0, 60.0),
                ],
            )
            .unwrap();
        // 50 -> 66 -> 77, wrapped
        assert_eq!(starts(&resolution), vec![17.0, 44.0, 6.0, 50.0]);
        assert!(resolution.merges.is_empty());
        assert_eq!(resolution.slots[1], None);
        assert!(resolution.remaining_conflicts(&table).is_empty());
    }

    #[test]
    fn conflict_free_input_is_left_alone() {
        let table = ConflictTable::two_way();
        let phases = vec![
            phase(0, Direction::Straight, 3.0, 20.0, 60.0),
            phase(1, Direction::Straight, 30.0, 20.0, 50.0),
        ];
        let id = IntersectionID::from("i");

        let resolution = ConflictResolver::new(&table, &PlanOptions::default())
            .resolve_if_needed(&id, &phases)
            .unwrap();
        assert_eq!(starts(&resolution), vec![3.0, 30.0]);
        assert_eq!(resolution.cycle_length, 60.0);
        assert_eq!(resolution.conflicts_before, 0);

        let opts = PlanOptions {
            always_resolve: true,
            ..PlanOptions::default()
        };
        let resolution = ConflictResolver::new(&table, &opts)
            .resolve_if_needed(&id, &phases)
            .unwrap();
        assert_eq!(starts(&resolution), vec![3.0, 24.0]);
    }

    #[test]
    fn exactly_filling_the_cycle() {
        let table = ConflictTable::two_way();
        let opts = PlanOptions {
            clearance_seconds: 0.0,
            ..PlanOptions::default()
        };
        let resolution = ConflictResolver::new(&table, &opts)
            .resolve(
                &IntersectionID::from("i"),
                &[
                    phase(0, Direction::Straight, 0.0, 30.0, 60.0),
                    phase(1, Direction::Straight, 0.0, 30.0, 60.0),
                ],
            )
            .unwrap();
        assert_eq!(starts(&resolution), vec![0.0, 30.0]);
    }

    #[test]
    fn overrunning_slots_are_caught() {
        let table = ConflictTable::two_way();
        let resolver = ConflictResolver::new(&table, &PlanOptions::default());
        let id = IntersectionID::from("i");
        let phases = vec![
            phase(0, Direction::Straight, 10.0, 30.0, 60.0),
            phase(1, Direction::Straight, 0.0, 30.0, 60.0),
        ];
        let groups = MovementGroups::new(&phases);

        // 31 + 31 is more than the cycle, so the second slot runs past the reference again
        let err = resolver
            .lay_out(&id, &groups, &phases, 10.0, 60.0)
            .unwrap_err();
        match &err {
            SignalError::PhaseOverrun {
                movement, offset, ..
            } => {
                assert_eq!(*movement, MovementID::new(1, Direction::Straight));
                assert_eq!(*offset, 62.0);
            }
            x => panic!("unexpected {}", x),
        }
        assert!(err.grouped_state().is_some());

        let starts = resolver
            .lay_out(&id, &groups, &phases, 10.0, 70.0)
            .unwrap();
        assert_eq!(starts.into_iter().collect::<Vec<_>>(), vec![(0, 10.0), (1, 41.0)]);
    }
}
