use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use abstutil::Timer;
use signal_plan::batch::resolve_all;
use signal_plan::{IntersectionID, PlanOptions, SignalError};
use traffic_signal_data::PhaseRecord;

/// Everything needed to reproduce one intersection's failure.
#[derive(Serialize)]
struct FailureReport<'a> {
    intersection: &'a IntersectionID,
    kind: &'static str,
    message: String,
    /// The grouped schedule at the point of failure, if the resolver got that far
    groups: Option<serde_json::Value>,
}

impl<'a> FailureReport<'a> {
    fn new(err: &'a SignalError) -> Result<FailureReport<'a>> {
        let groups = match err.grouped_state() {
            Some(dump) => Some(serde_json::from_str(dump).context("re-reading a grouped dump")?),
            None => None,
        };
        Ok(FailureReport {
            intersection: err.intersection(),
            kind: err.kind(),
            message: err.to_string(),
            groups,
        })
    }
}

pub fn run(
    input: String,
    output: String,
    conflict_table: Option<String>,
    failures_dir: Option<String>,
    opts: PlanOptions,
) -> Result<()> {
    let mut timer = Timer::new("resolve conflicts");
    let table = crate::load_conflict_table(conflict_table)?;
    let phases: BTreeMap<IntersectionID, serde_json::Value> = abstutil::read_json(&input)?;
    let num_input = phases.len();

    let outcome = resolve_all(phases, &table, &opts, &mut timer);
    for resolution in &outcome.succeeded {
        let remaining = resolution.remaining_conflicts(&table);
        if !remaining.is_empty() {
            timer.error(format!(
                "{} still has {} conflicts after resolving",
                resolution.intersection,
                remaining.len()
            ));
        }
    }

    let resolved: BTreeMap<&IntersectionID, Vec<PhaseRecord>> = outcome
        .succeeded
        .iter()
        .map(|r| (&r.intersection, r.to_records()))
        .collect();
    abstutil::write_json(&output, &resolved)?;

    if let Some(dir) = failures_dir {
        fs_err::create_dir_all(&dir)?;
        for err in &outcome.failed {
            let name = format!("{}.{}.json", err.intersection().0, err.kind());
            abstutil::write_json(Path::new(&dir).join(name), &FailureReport::new(err)?)?;
        }
    }

    timer.note(format!(
        "Resolved {}/{} intersections: {}",
        abstutil::prettyprint_usize(resolved.len()),
        abstutil::prettyprint_usize(num_input),
        outcome.describe()
    ));
    Ok(())
}
