use std::collections::BTreeMap;

use traffic_signal_data::{
    IntersectionTimingRecord, RawIntersectionRecord, TimingGroup, TimingObservation,
};

use crate::{Approach, Direction, LinkID};

/// Intersections with more legs than this need hand-tuned plans.
const MAX_STANDARD_LEGS: usize = 4;

/// Only intersections with at most 4 approaches and 4 outgoing links fit the simple
/// two-groups-per-approach model.
pub fn is_standard_layout(raw: &RawIntersectionRecord) -> bool {
    raw.in_links.len() <= MAX_STANDARD_LEGS && raw.out_links.len() <= MAX_STANDARD_LEGS
}

/// Files every per-link observation under the approach owning that link, and averages repeated
/// observations of the same (approach, direction). Observations on links that don't belong to
/// any approach are dropped with a warning.
pub fn group_observations(raw: &RawIntersectionRecord) -> IntersectionTimingRecord {
    let mut grouped: BTreeMap<Approach, BTreeMap<Direction, Vec<&TimingObservation>>> =
        BTreeMap::new();
    for (link, observations) in &raw.signal_info {
        let approach = match find_approach(link, &raw.in_links) {
            Some(a) => a,
            None => {
                warn!(
                    "{}: link {} doesn't belong to any approach, skipping {} observations",
                    raw.intersection_id,
                    link,
                    observations.len()
                );
                continue;
            }
        };
        for obs in observations {
            grouped
                .entry(approach)
                .or_default()
                .entry(obs.dir)
                .or_default()
                .push(obs);
        }
    }

    let signal_info = grouped
        .into_iter()
        .map(|(approach, per_dir)| {
            let per_dir = per_dir
                .into_iter()
                .map(|(dir, list)| (dir, average(&list)))
                .collect();
            (approach, per_dir)
        })
        .collect();

    IntersectionTimingRecord {
        intersection_id: raw.intersection_id.clone(),
        signal_info,
        in_links: raw.in_links.clone(),
        out_links: raw.out_links.clone(),
        link_info: raw.link_info.clone(),
    }
}

fn find_approach(link: &LinkID, in_links: &BTreeMap<Approach, Vec<LinkID>>) -> Option<Approach> {
    in_links
        .iter()
        .find(|(_, links)| links.contains(link))
        .map(|(approach, _)| *approach)
}

// Only called with non-empty lists
fn average(list: &[&TimingObservation]) -> TimingGroup {
    let n = list.len() as f64;
    let mean = |f: fn(&TimingObservation) -> f64| list.iter().map(|obs| f(obs)).sum::<f64>() / n;
    TimingGroup {
        green_time: mean(|obs| obs.green_time),
        cycle_time: mean(|obs| obs.cycle_time),
        red_time: mean(|obs| obs.red_time),
        start_time: mean(|obs| obs.start_time),
        end_time: mean(|obs| obs.end_time),
    }
}
