use std::collections::BTreeMap;

use anyhow::Result;

use abstutil::Timer;
use signal_plan::batch::build_all;
use signal_plan::{IntersectionID, PlanOptions};
use traffic_signal_data::{IntersectionTimingRecord, LinkSignal, PhaseRecord};

pub fn run(
    input: String,
    output: String,
    grouped_output: Option<String>,
    phases_output: Option<String>,
    opts: PlanOptions,
) -> Result<()> {
    let mut timer = Timer::new("build phases");
    let step = format!("read {}", input);
    timer.start(&step);
    // Each record is decoded on its own later, so one bad record can't sink the whole file
    let raw: Vec<serde_json::Value> = abstutil::read_json(&input)?;
    timer.stop(&step);

    let outcome = build_all(raw, &opts, &mut timer);

    let signals: Vec<&LinkSignal> = outcome
        .succeeded
        .iter()
        .flat_map(|built| built.link_signals.iter())
        .collect();
    abstutil::write_json(&output, &signals)?;

    if let Some(path) = grouped_output {
        let grouped: Vec<&IntersectionTimingRecord> =
            outcome.succeeded.iter().map(|built| &built.grouped).collect();
        abstutil::write_json(path, &grouped)?;
    }
    if let Some(path) = phases_output {
        let phases: BTreeMap<&IntersectionID, Vec<PhaseRecord>> = outcome
            .succeeded
            .iter()
            .map(|built| (&built.plan.intersection, built.plan.to_records()))
            .collect();
        abstutil::write_json(path, &phases)?;
    }

    timer.note(format!(
        "Planned {} links: {}",
        abstutil::prettyprint_usize(signals.len()),
        outcome.describe()
    ));
    Ok(())
}
