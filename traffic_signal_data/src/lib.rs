//! The on-disk representation of signal timing, as it flows in from upstream measurement tools
//! and back out to whatever renders or simulates the plan. Field names follow the upstream JSON,
//! so these records are deliberately dumb; all interpretation happens in `signal_plan`.

mod ids;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use crate::ids::{Approach, Direction, IntersectionID, LinkID};

/// Averaged timing measured for one (approach, direction) at one intersection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimingGroup {
    /// Seconds of green per cycle.
    pub green_time: f64,
    /// The cycle length this movement was observed with, in seconds. Different movements at the
    /// same intersection often disagree.
    pub cycle_time: f64,
    /// Informational only.
    #[serde(default)]
    pub red_time: f64,
    /// Informational only.
    #[serde(default)]
    pub start_time: f64,
    /// Informational only.
    #[serde(default)]
    pub end_time: f64,
}

/// A single timing measurement for one incoming link, before observations are grouped by
/// approach.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimingObservation {
    pub dir: Direction,
    pub green_time: f64,
    pub cycle_time: f64,
    #[serde(default)]
    pub red_time: f64,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
}

/// Where traffic leaving one incoming link can go.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct LinkTopology {
    /// Each downstream link, and the direction a vehicle takes to reach it.
    pub dir: BTreeMap<LinkID, Direction>,
}

/// Per-link observations for one intersection, as produced by the timing inference tools.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawIntersectionRecord {
    #[serde(rename = "inter_id")]
    pub intersection_id: IntersectionID,
    /// Every observation, keyed by the incoming link it was measured on.
    pub signal_info: BTreeMap<LinkID, Vec<TimingObservation>>,
    /// The incoming links belonging to each approach.
    pub in_links: BTreeMap<Approach, Vec<LinkID>>,
    #[serde(default)]
    pub out_links: Vec<LinkID>,
    /// Downstream topology of every incoming link.
    #[serde(default)]
    pub link_info: BTreeMap<LinkID, LinkTopology>,
}

/// Timing for one intersection after observations have been grouped by approach and direction.
/// This is the input to the phase builder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IntersectionTimingRecord {
    #[serde(rename = "inter_id")]
    pub intersection_id: IntersectionID,
    pub signal_info: BTreeMap<Approach, BTreeMap<Direction, TimingGroup>>,
    pub in_links: BTreeMap<Approach, Vec<LinkID>>,
    #[serde(default)]
    pub out_links: Vec<LinkID>,
    #[serde(default)]
    pub link_info: BTreeMap<LinkID, LinkTopology>,
}

/// One scheduled movement, the unit the conflict resolver reads and writes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PhaseRecord {
    #[serde(rename = "way", alias = "approach")]
    pub approach: Approach,
    #[serde(rename = "dir", alias = "direction")]
    pub direction: Direction,
    pub cycle_length: f64,
    /// Seconds after the start of the cycle when this movement turns green.
    pub green_start: f64,
    pub green_time: f64,
    #[serde(default)]
    pub link_ids: Vec<LinkID>,
    /// How many vehicles the timing was inferred from. The best-sampled record wins when several
    /// describe the same movement.
    #[serde(default)]
    pub vehicle_count: usize,
    #[serde(default)]
    pub covered_vehicles: usize,
    #[serde(default)]
    pub coverage_rate: f64,
    #[serde(default)]
    pub data_source: String,
}

/// The light shown to traffic going from one incoming link to one downstream link.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Light {
    #[serde(rename = "out_nds_id")]
    pub out_link_id: LinkID,
    /// The cycle length, in seconds.
    pub period: f64,
    pub green_time: f64,
    /// Counted backwards from the end of the cycle: the light turns green at
    /// `period - initial_phase` (mod `period`).
    pub initial_phase: f64,
}

/// The final, per-link output of the phase builder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LinkSignal {
    #[serde(rename = "nds_id")]
    pub link_id: LinkID,
    /// Every downstream link reachable from this one, sorted and comma-separated.
    pub out_top: String,
    pub lights: Vec<Light>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_ids_accept_numbers() {
        let ids: Vec<LinkID> = serde_json::from_str(r#"[12345, "678", -3]"#).unwrap();
        assert_eq!(
            ids,
            vec![LinkID::from("12345"), LinkID::from("678"), LinkID::from("-3")]
        );
        assert_eq!(
            serde_json::to_string(&ids).unwrap(),
            r#"["12345","678","-3"]"#
        );
    }

    #[test]
    fn directions_use_upstream_codes() {
        let dirs: Vec<Direction> = serde_json::from_str("[0, 1, 2, 7]").unwrap();
        assert_eq!(
            dirs,
            vec![
                Direction::Straight,
                Direction::Left,
                Direction::Right,
                Direction::UTurn
            ]
        );
        assert!(serde_json::from_str::<Direction>("3").is_err());
        assert_eq!(serde_json::to_string(&Direction::UTurn).unwrap(), "7");
    }

    #[test]
    fn grouped_record_with_string_keys() {
        let json = r#"{
            "inter_id": "i1",
            "signal_info": {
                "0": {"0": {"green_time": 20.0, "cycle_time": 60.0}},
                "1": {"1": {"green_time": 10.0, "cycle_time": 58.0, "red_time": 48.0}}
            },
            "in_links": {"0": [100, 101], "1": ["200"]},
            "link_info": {"100": {"dir": {"300": 0, "301": 2}}}
        }"#;
        let record: IntersectionTimingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.intersection_id, IntersectionID::from("i1"));
        assert_eq!(
            record.signal_info[&Approach(1)][&Direction::Left].red_time,
            48.0
        );
        assert_eq!(
            record.in_links[&Approach(0)],
            vec![LinkID::from("100"), LinkID::from("101")]
        );
        assert_eq!(
            record.link_info[&LinkID::from("100")].dir[&LinkID::from("301")],
            Direction::Right
        );
        assert!(record.out_links.is_empty());
    }

    #[test]
    fn phase_record_field_names() {
        let json = r#"{"way": 1, "dir": 7, "cycle_length": 90.0, "green_start": 3.5,
                       "green_time": 12.0, "vehicle_count": 40}"#;
        let record: PhaseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.approach, Approach(1));
        assert_eq!(record.direction, Direction::UTurn);
        assert!(record.link_ids.is_empty());
        assert_eq!(record.data_source, "");

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["way"], 1);
        assert_eq!(out["dir"], 7);
    }
}
