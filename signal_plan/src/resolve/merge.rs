use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Approach, Direction, MovementGroups, MovementID, Phase};

/// Folds one slot into another, so both movements go green together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStep {
    pub from: MovementID,
    pub into: MovementID,
}

const fn merge(approach: usize, from: Direction, into: Direction) -> MergeStep {
    MergeStep {
        from: MovementID {
            approach: Approach(approach),
            direction: from,
        },
        into: MovementID {
            approach: Approach(approach),
            direction: into,
        },
    }
}

/// When a cycle is too short for every slot, these merges are tried in order: U-turns into lefts,
/// then lefts into straights, way 1 before way 0 each time.
pub const FALLBACK_ORDER: [MergeStep; 4] = [
    merge(1, Direction::UTurn, Direction::Left),
    merge(0, Direction::UTurn, Direction::Left),
    merge(1, Direction::Left, Direction::Straight),
    merge(0, Direction::Left, Direction::Straight),
];

impl MergeStep {
    pub fn apply(self, groups: MovementGroups) -> MovementGroups {
        groups.merge(self.from, self.into)
    }
}

impl fmt::Display for MergeStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} into {}", self.from, self.into)
    }
}

/// Applies merges from `FALLBACK_ORDER` until the slots fit in the cycle or the merges run out.
/// Steps with nothing to merge are skipped. Returns the final grouping and the merges that
/// actually happened; the caller decides whether the result fits.
pub(crate) fn fit_to_cycle(
    groups: MovementGroups,
    phases: &[Phase],
    cycle_length: f64,
    clearance: f64,
) -> (MovementGroups, Vec<MergeStep>) {
    FALLBACK_ORDER
        .iter()
        .fold((groups, Vec::new()), |(groups, mut applied), step| {
            if groups.critical_time(phases, clearance) <= cycle_length
                || !groups.contains(step.from)
            {
                return (groups, applied);
            }
            applied.push(*step);
            (step.apply(groups), applied)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provenance;

    fn phase(approach: usize, direction: Direction, green: f64) -> Phase {
        Phase {
            movement: MovementID::new(approach, direction),
            green_start: 0.0,
            green_time: green,
            cycle_length: 60.0,
            link_ids: Vec::new(),
            provenance: Provenance::default(),
        }
    }

    fn crowded() -> Vec<Phase> {
        vec![
            phase(0, Direction::Straight, 20.0),
            phase(0, Direction::Left, 15.0),
            phase(0, Direction::UTurn, 10.0),
            phase(1, Direction::Straight, 15.0),
            phase(1, Direction::Left, 10.0),
            phase(1, Direction::UTurn, 5.0),
        ]
    }

    #[test]
    fn nothing_to_do_when_it_fits() {
        let phases = crowded();
        let groups = MovementGroups::new(&phases);
        // 21 + 16 + 11 + 16 + 11 + 6
        assert_eq!(groups.critical_time(&phases, 1.0), 81.0);
        let (after, applied) = fit_to_cycle(groups.clone(), &phases, 81.0, 1.0);
        assert_eq!(after, groups);
        assert!(applied.is_empty());
    }

    #[test]
    fn stops_as_soon_as_it_fits() {
        let phases = crowded();
        // Folding both U-turns in saves 6 + 11
        let (after, applied) = fit_to_cycle(MovementGroups::new(&phases), &phases, 64.0, 1.0);
        assert_eq!(applied, FALLBACK_ORDER[0..2].to_vec());
        assert_eq!(after.critical_time(&phases, 1.0), 64.0);
        assert_eq!(after.get(MovementID::new(1, Direction::Left)), Some(&[4, 5][..]));
    }

    #[test]
    fn missing_sources_are_skipped() {
        let phases = vec![
            phase(0, Direction::Straight, 20.0),
            phase(0, Direction::Left, 15.0),
            phase(1, Direction::Straight, 20.0),
        ];
        // 21 + 16 + 21 = 58
        let (after, applied) = fit_to_cycle(MovementGroups::new(&phases), &phases, 45.0, 1.0);
        assert_eq!(applied, vec![FALLBACK_ORDER[3]]);
        assert_eq!(after.critical_time(&phases, 1.0), 42.0);
    }

    #[test]
    fn gives_up_after_every_merge() {
        let phases = crowded();
        let (after, applied) = fit_to_cycle(MovementGroups::new(&phases), &phases, 30.0, 1.0);
        assert_eq!(applied, FALLBACK_ORDER.to_vec());
        // Only the two straights are left
        assert_eq!(after.len(), 2);
        assert_eq!(after.critical_time(&phases, 1.0), 37.0);
    }
}
