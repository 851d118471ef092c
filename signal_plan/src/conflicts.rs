use std::collections::{BTreeMap, BTreeSet};

use crate::{Approach, Direction, MovementID};

const CONTROLLED: [Direction; 3] = [Direction::Straight, Direction::Left, Direction::UTurn];

/// Which movements can never be green at the same time. Symmetric by construction, and never
/// mutated after it's built; share one table by reference across every intersection.
#[derive(Clone, Debug, PartialEq)]
pub struct ConflictTable {
    conflicts: BTreeMap<MovementID, BTreeSet<MovementID>>,
}

impl ConflictTable {
    /// The baseline for a standard two-road intersection.
    pub fn two_way() -> ConflictTable {
        ConflictTable::standard(&[Approach(0), Approach(1)])
    }

    /// On every approach, straight, left, and U-turn movements exclude each other and everything
    /// except right turns on every other approach. Right turns are permissive and conflict with
    /// nothing.
    pub fn standard(approaches: &[Approach]) -> ConflictTable {
        let mut pairs = Vec::new();
        for a1 in approaches {
            for a2 in approaches {
                for d1 in CONTROLLED {
                    for d2 in CONTROLLED {
                        if a1 == a2 && d1 == d2 {
                            continue;
                        }
                        pairs.push((
                            MovementID {
                                approach: *a1,
                                direction: d1,
                            },
                            MovementID {
                                approach: *a2,
                                direction: d2,
                            },
                        ));
                    }
                }
            }
        }
        ConflictTable::from_pairs(pairs)
    }

    /// Each pair is recorded in both directions. A movement can't conflict with itself; such
    /// pairs are ignored.
    pub fn from_pairs<I: IntoIterator<Item = (MovementID, MovementID)>>(pairs: I) -> ConflictTable {
        let mut conflicts: BTreeMap<MovementID, BTreeSet<MovementID>> = BTreeMap::new();
        for (m1, m2) in pairs {
            if m1 == m2 {
                warn!("Ignoring {} conflicting with itself", m1);
                continue;
            }
            conflicts.entry(m1).or_default().insert(m2);
            conflicts.entry(m2).or_default().insert(m1);
        }
        ConflictTable { conflicts }
    }

    /// All pairs, each once, with the smaller movement first. This is the format for storing a
    /// table in a file.
    pub fn pairs(&self) -> Vec<(MovementID, MovementID)> {
        let mut pairs = Vec::new();
        for (m1, others) in &self.conflicts {
            for m2 in others {
                if m1 < m2 {
                    pairs.push((*m1, *m2));
                }
            }
        }
        pairs
    }

    pub fn conflicts(&self, m1: MovementID, m2: MovementID) -> bool {
        self.conflicts_with(m1).any(|m| *m == m2)
    }

    pub fn conflicts_with(&self, m: MovementID) -> impl Iterator<Item = &MovementID> {
        self.conflicts.get(&m).into_iter().flatten()
    }
}

impl Default for ConflictTable {
    fn default() -> ConflictTable {
        ConflictTable::two_way()
    }
}
