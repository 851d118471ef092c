//! Builds and repairs fixed-time signal plans for single intersections.
//!
//! The [phase builder](build_phases) lays measured green times out around one shared cycle,
//! spreading the leftover time evenly as clearance. The [conflict resolver](ConflictResolver)
//! takes a phase list from any source, deduplicates repeated measurements of the same movement,
//! and re-anchors everything to a reference movement so that no two conflicting movements are
//! green at once, merging turning movements when the cycle is too short.
//!
//! Everything here is a pure function of its input; intersections are independent, so
//! [`batch`] processes many of them in parallel.

#[macro_use]
extern crate log;

pub mod batch;
mod conflicts;
mod error;
mod make;
mod movement;
mod options;
mod phase;
mod resolve;

pub use crate::conflicts::ConflictTable;
pub use crate::error::SignalError;
pub use crate::make::{build_phases, group_observations, is_standard_layout, PhasePlan};
pub use crate::movement::{IntersectionSchedule, Movement, MovementID, Provenance};
pub use crate::options::PlanOptions;
pub use crate::phase::{BackwardOffset, GreenInterval, Phase};
pub use crate::resolve::{
    detect_conflicts, ConflictResolver, MergeStep, MovementGroups, Resolution, FALLBACK_ORDER,
};

pub use traffic_signal_data::{Approach, Direction, IntersectionID, LinkID};

/// Offsets and sums are compared with this much slack.
pub const EPSILON: f64 = 1e-6;
