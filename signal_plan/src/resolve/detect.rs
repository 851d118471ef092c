use crate::{ConflictTable, Phase};

/// Every pair of phases (by index, smaller first) whose movements conflict and whose greens
/// overlap. Assumes all phases already share one cycle length.
pub fn detect_conflicts(phases: &[Phase], table: &ConflictTable) -> Vec<(usize, usize)> {
    let mut conflicts = Vec::new();
    for (idx1, p1) in phases.iter().enumerate() {
        for (idx2, p2) in phases.iter().enumerate().skip(idx1 + 1) {
            if phases_conflict(p1, p2, table) {
                conflicts.push((idx1, idx2));
            }
        }
    }
    conflicts
}

pub(crate) fn phases_conflict(p1: &Phase, p2: &Phase, table: &ConflictTable) -> bool {
    table.conflicts(p1.movement, p2.movement) && p1.interval().overlaps(&p2.interval())
}
