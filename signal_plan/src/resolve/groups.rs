use std::collections::BTreeMap;

use traffic_signal_data::PhaseRecord;

use crate::{Approach, Direction, MovementID, Phase};

/// Phases bucketed into the slots they'll be scheduled in, keyed by the movement that owns the
/// slot. Members are indices into the phase list the groups were built from. Right turns are
/// permissive and never get a slot.
///
/// Iteration order is the scheduling order: approaches ascending, then straight, left, U-turn.
#[derive(Clone, Debug, PartialEq)]
pub struct MovementGroups {
    groups: BTreeMap<MovementID, Vec<usize>>,
}

impl MovementGroups {
    pub fn new(phases: &[Phase]) -> MovementGroups {
        let mut groups: BTreeMap<MovementID, Vec<usize>> = BTreeMap::new();
        for (idx, phase) in phases.iter().enumerate() {
            if phase.movement.is_signalized() {
                groups.entry(phase.movement).or_default().push(idx);
            }
        }
        MovementGroups { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MovementID, &[usize])> {
        self.groups.iter().map(|(id, members)| (*id, members.as_slice()))
    }

    pub fn contains(&self, id: MovementID) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn get(&self, id: MovementID) -> Option<&[usize]> {
        self.groups.get(&id).map(|members| members.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The slot a phase is scheduled in, or None for right turns.
    pub fn slot_of(&self, idx: usize) -> Option<MovementID> {
        self.groups
            .iter()
            .find(|(_, members)| members.contains(&idx))
            .map(|(id, _)| *id)
    }

    /// A slot lasts as long as its longest member.
    pub fn slot_time(members: &[usize], phases: &[Phase]) -> f64 {
        members
            .iter()
            .map(|idx| phases[*idx].green_time)
            .fold(0.0, f64::max)
    }

    /// The time every slot needs, including the clearance after each one.
    pub fn critical_time(&self, phases: &[Phase], clearance: f64) -> f64 {
        self.groups
            .values()
            .map(|members| MovementGroups::slot_time(members, phases) + clearance)
            .sum()
    }

    /// Moves every member of one slot into another, creating the target if needed. Merging a
    /// slot that doesn't exist changes nothing.
    pub(crate) fn merge(mut self, from: MovementID, into: MovementID) -> MovementGroups {
        if let Some(members) = self.groups.remove(&from) {
            self.groups.entry(into).or_default().extend(members);
        }
        self
    }

    /// The grouped state as pretty JSON (approach -> direction -> phases), for debugging
    /// failures.
    pub fn dump(&self, phases: &[Phase]) -> String {
        let mut out: BTreeMap<Approach, BTreeMap<Direction, Vec<PhaseRecord>>> = BTreeMap::new();
        for (id, members) in &self.groups {
            out.entry(id.approach).or_default().insert(
                id.direction,
                members.iter().map(|idx| phases[*idx].to_record()).collect(),
            );
        }
        serde_json::to_string_pretty(&out)
            .unwrap_or_else(|err| format!("couldn't dump the grouped schedule: {}", err))
    }
}
