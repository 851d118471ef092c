//! Command-line tools for building and repairing signal plans over whole files of intersections.

#[macro_use]
extern crate log;

mod build_phases;
mod resolve_conflicts;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use structopt::StructOpt;

use abstutil::Timer;
use signal_plan::batch::decode_phases;
use signal_plan::{
    ConflictResolver, ConflictTable, GreenInterval, IntersectionID, MovementID, PlanOptions,
};

#[derive(StructOpt)]
#[structopt(name = "signal_cli", about = "Plans fixed-time traffic signals")]
enum Command {
    /// Groups raw per-link timing observations and lays out a first-draft plan for every
    /// intersection, written per incoming link.
    BuildPhases {
        /// The path to a JSON list of raw intersection records
        #[structopt(long)]
        input: String,
        /// The path to write the per-link signal plans
        #[structopt(long)]
        output: String,
        /// Also write the observations after grouping them by approach and direction
        #[structopt(long)]
        grouped_output: Option<String>,
        /// Also write the draft phases per intersection, in the format `resolve-conflicts` reads
        #[structopt(long)]
        phases_output: Option<String>,
        #[structopt(flatten)]
        opts: PlanOptions,
    },
    /// Re-times every intersection so that conflicting movements are never green together.
    ResolveConflicts {
        /// The path to a JSON object mapping intersection IDs to lists of phases
        #[structopt(long)]
        input: String,
        /// The path to write the resolved phases, in the same format as the input. Intersections
        /// that fail are left out.
        #[structopt(long)]
        output: String,
        /// A JSON list of conflicting movement pairs, replacing the two-way baseline
        #[structopt(long)]
        conflict_table: Option<String>,
        /// If specified, write a JSON file describing every failed intersection to this
        /// directory
        #[structopt(long)]
        failures_dir: Option<String>,
        #[structopt(flatten)]
        opts: PlanOptions,
    },
    /// Reports conflicting phases without changing anything.
    DetectConflicts {
        /// The path to a JSON object mapping intersection IDs to lists of phases
        #[structopt(long)]
        input: String,
        /// A JSON list of conflicting movement pairs, replacing the two-way baseline
        #[structopt(long)]
        conflict_table: Option<String>,
        #[structopt(flatten)]
        opts: PlanOptions,
    },
    /// Prints when every phase is green, splitting greens that wrap past the end of the cycle.
    Timeline {
        /// The path to a JSON object mapping intersection IDs to lists of phases
        #[structopt(long)]
        input: String,
        /// A JSON list of conflicting movement pairs, replacing the two-way baseline
        #[structopt(long)]
        conflict_table: Option<String>,
        #[structopt(flatten)]
        opts: PlanOptions,
    },
}

fn main() -> Result<()> {
    abstutil::logger::setup();

    match Command::from_args() {
        Command::BuildPhases {
            input,
            output,
            grouped_output,
            phases_output,
            opts,
        } => build_phases::run(input, output, grouped_output, phases_output, opts),
        Command::ResolveConflicts {
            input,
            output,
            conflict_table,
            failures_dir,
            opts,
        } => resolve_conflicts::run(input, output, conflict_table, failures_dir, opts),
        Command::DetectConflicts {
            input,
            conflict_table,
            opts,
        } => detect_conflicts(input, conflict_table, opts),
        Command::Timeline {
            input,
            conflict_table,
            opts,
        } => timeline(input, conflict_table, opts),
    }
}

fn load_conflict_table(path: Option<String>) -> Result<ConflictTable> {
    let path = match path {
        Some(path) => path,
        None => return Ok(ConflictTable::two_way()),
    };
    let pairs: Vec<(MovementID, MovementID)> = abstutil::read_json(&path)?;
    if pairs.is_empty() {
        bail!("{} doesn't declare any conflicts", path);
    }
    let table = ConflictTable::from_pairs(pairs);
    info!(
        "Loaded {} conflicting pairs from {}",
        abstutil::prettyprint_usize(table.pairs().len()),
        path
    );
    Ok(table)
}

fn detect_conflicts(
    input: String,
    conflict_table: Option<String>,
    opts: PlanOptions,
) -> Result<()> {
    let mut timer = Timer::new("detect conflicts");
    let table = load_conflict_table(conflict_table)?;
    let phases: BTreeMap<IntersectionID, serde_json::Value> = abstutil::read_json(&input)?;

    let outcome = signal_plan::batch::detect_all(phases, &table, &opts, &mut timer);
    let mut total = 0;
    for detection in &outcome.succeeded {
        if detection.conflicts.is_empty() {
            continue;
        }
        total += detection.conflicts.len();
        println!(
            "{}: {} conflicts",
            detection.intersection,
            detection.conflicts.len()
        );
        for (idx1, idx2) in &detection.conflicts {
            println!(
                "  {} and {}",
                detection.phases[*idx1].movement, detection.phases[*idx2].movement
            );
        }
    }
    println!(
        "{} conflicts over {} intersections ({})",
        abstutil::prettyprint_usize(total),
        abstutil::prettyprint_usize(outcome.succeeded.len() + outcome.failed.len()),
        outcome.describe()
    );
    Ok(())
}

fn timeline(input: String, conflict_table: Option<String>, opts: PlanOptions) -> Result<()> {
    let table = load_conflict_table(conflict_table)?;
    let resolver = ConflictResolver::new(&table, &opts);
    let all: BTreeMap<IntersectionID, serde_json::Value> = abstutil::read_json(&input)?;
    for (id, value) in all {
        let detected = decode_phases(&id, value)
            .and_then(|phases| Ok((resolver.detect(&id, &phases)?, phases)));
        let (conflicts, phases) = match detected {
            Ok(pairs) => pairs,
            Err(err) => {
                error!("{}", err);
                continue;
            }
        };
        let cycle_length = phases.iter().map(|p| p.cycle_length).fold(0.0, f64::max);

        println!("{} ({}s cycle)", id, cycle_length);
        for (idx, phase) in phases.iter().enumerate() {
            let interval = GreenInterval {
                cycle_length,
                ..phase.interval()
            };
            let segments = interval
                .segments()
                .into_iter()
                .map(|(start, length)| format!("[{}, {})", start, start + length))
                .collect::<Vec<_>>();
            let conflicting = conflicts
                .iter()
                .any(|(idx1, idx2)| *idx1 == idx || *idx2 == idx);
            println!(
                "  {}: {}{}",
                phase.movement,
                if segments.is_empty() {
                    "never green".to_string()
                } else {
                    segments.join(" + ")
                },
                if conflicting { " (conflicts)" } else { "" }
            );
        }
    }
    Ok(())
}
