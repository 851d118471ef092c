//! Runs the builder and the resolver over whole files of intersections. Intersections are
//! independent, so they're processed in parallel, and one failing never stops the others. Each
//! intersection's records are decoded separately, so a malformed record only fails its own
//! intersection.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use abstutil::Timer;
use traffic_signal_data::{IntersectionTimingRecord, LinkSignal, PhaseRecord, RawIntersectionRecord};

use crate::{
    build_phases, group_observations, is_standard_layout, ConflictResolver, ConflictTable,
    IntersectionID, Phase, PhasePlan, PlanOptions, Resolution, SignalError,
};

/// What happened to every intersection in one batch. Each list is in input order.
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<SignalError>,
    /// Intersections deliberately not processed.
    pub skipped: Vec<IntersectionID>,
}

impl<T> BatchOutcome<T> {
    fn new() -> BatchOutcome<T> {
        BatchOutcome {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn collect(results: Vec<Result<T, SignalError>>, skipped: Vec<IntersectionID>) -> Self {
        let mut outcome = BatchOutcome::new();
        outcome.skipped = skipped;
        for result in results {
            match result {
                Ok(x) => outcome.succeeded.push(x),
                Err(err) => {
                    error!("{}", err);
                    outcome.failed.push(err);
                }
            }
        }
        outcome
    }

    pub fn describe(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped",
            abstutil::prettyprint_usize(self.succeeded.len()),
            abstutil::prettyprint_usize(self.failed.len()),
            abstutil::prettyprint_usize(self.skipped.len())
        )
    }
}

/// One intersection's draft plan, along with everything derived from it.
pub struct BuiltIntersection {
    pub grouped: IntersectionTimingRecord,
    pub plan: PhasePlan,
    pub link_signals: Vec<LinkSignal>,
}

/// Groups raw observations and builds a plan for every standard intersection. The input is a
/// list of raw intersection records, not yet decoded.
pub fn build_all(
    raw: Vec<Value>,
    opts: &PlanOptions,
    timer: &mut Timer,
) -> BatchOutcome<BuiltIntersection> {
    let mut skipped = Vec::new();
    let mut requests = Vec::new();
    for (idx, value) in raw.into_iter().enumerate() {
        let id = raw_intersection_id(&value, idx);
        match decode::<RawIntersectionRecord>(&id, value) {
            Ok(record) => {
                if opts.include_special_layouts || is_standard_layout(&record) {
                    requests.push(Ok(record));
                } else {
                    skipped.push(record.intersection_id);
                }
            }
            Err(err) => requests.push(Err(err)),
        }
    }
    if !skipped.is_empty() {
        timer.warn(format!(
            "Skipping {} intersections with more than 4 legs: {}",
            skipped.len(),
            abstutil::plain_list_names(skipped.iter().map(|id| id.0.clone()).collect())
        ));
    }

    let results = timer.parallelize(
        "build phases",
        requests,
        |raw| -> Result<BuiltIntersection, SignalError> {
            let grouped = group_observations(&raw?);
            let plan = build_phases(&grouped, opts)?;
            let link_signals = plan.link_signals(&grouped.link_info)?;
            Ok(BuiltIntersection {
                grouped,
                plan,
                link_signals,
            })
        },
    );
    BatchOutcome::collect(results, skipped)
}

/// Resolves every intersection's phase list against one shared conflict table. The input maps
/// each intersection to its phase records, not yet decoded.
pub fn resolve_all(
    input: BTreeMap<IntersectionID, Value>,
    table: &ConflictTable,
    opts: &PlanOptions,
    timer: &mut Timer,
) -> BatchOutcome<Resolution> {
    let resolver = ConflictResolver::new(table, opts);
    let requests: Vec<(IntersectionID, Value)> = input.into_iter().collect();
    let results = timer.parallelize(
        "resolve conflicts",
        requests,
        |(id, value)| -> Result<Resolution, SignalError> {
            let phases = decode_phases(&id, value)?;
            resolver.resolve_if_needed(&id, &phases)
        },
    );

    let outcome = BatchOutcome::collect(results, Vec::new());
    let resolved = outcome
        .succeeded
        .iter()
        .filter(|r| r.conflicts_before > 0 || opts.always_resolve)
        .count();
    let merged = outcome
        .succeeded
        .iter()
        .filter(|r| !r.merges.is_empty())
        .count();
    timer.note(format!(
        "Re-timed {} intersections, {} of them needing merged movements",
        abstutil::prettyprint_usize(resolved),
        abstutil::prettyprint_usize(merged)
    ));
    outcome
}

/// The conflicting pairs found in one intersection, as indices into `phases`.
pub struct Detection {
    pub intersection: IntersectionID,
    pub phases: Vec<Phase>,
    pub conflicts: Vec<(usize, usize)>,
}

/// Finds conflicting pairs per intersection, without changing anything.
pub fn detect_all(
    input: BTreeMap<IntersectionID, Value>,
    table: &ConflictTable,
    opts: &PlanOptions,
    timer: &mut Timer,
) -> BatchOutcome<Detection> {
    let resolver = ConflictResolver::new(table, opts);
    let requests: Vec<(IntersectionID, Value)> = input.into_iter().collect();
    let results = timer.parallelize(
        "detect conflicts",
        requests,
        |(id, value)| -> Result<Detection, SignalError> {
            let phases = decode_phases(&id, value)?;
            let conflicts = resolver.detect(&id, &phases)?;
            Ok(Detection {
                intersection: id,
                phases,
                conflicts,
            })
        },
    );
    BatchOutcome::collect(results, Vec::new())
}

/// Decodes one intersection's phase records.
pub fn decode_phases(id: &IntersectionID, value: Value) -> Result<Vec<Phase>, SignalError> {
    let records: Vec<PhaseRecord> = decode(id, value)?;
    Ok(records.iter().map(Phase::from_record).collect())
}

fn decode<T: DeserializeOwned>(id: &IntersectionID, value: Value) -> Result<T, SignalError> {
    serde_json::from_value(value).map_err(|err| SignalError::malformed(id, err.to_string()))
}

/// Raw records name themselves. If even that's unreadable, fall back to the position in the file.
fn raw_intersection_id(value: &Value, idx: usize) -> IntersectionID {
    match value.get("inter_id") {
        Some(Value::String(id)) => IntersectionID(id.clone()),
        Some(Value::Number(id)) => IntersectionID(id.to_string()),
        _ => IntersectionID(format!("record {}", idx)),
    }
}
