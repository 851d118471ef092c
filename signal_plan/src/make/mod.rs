//! Turning measured timing into a first-draft plan.

mod grouping;
mod link_signals;
mod phase_builder;

pub use self::grouping::{group_observations, is_standard_layout};
pub use self::phase_builder::{build_phases, PhasePlan};
