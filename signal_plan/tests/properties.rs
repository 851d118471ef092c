use std::collections::BTreeMap;

use abstutil::Timer;
use signal_plan::batch;
use signal_plan::{
    build_phases, Approach, BackwardOffset, ConflictResolver, ConflictTable, Direction,
    IntersectionID, LinkID, MovementID, Phase, PlanOptions, Provenance, Resolution,
};
use traffic_signal_data::{IntersectionTimingRecord, PhaseRecord, TimingGroup};

const DIRECTIONS: [Direction; 4] = [
    Direction::Straight,
    Direction::Left,
    Direction::Right,
    Direction::UTurn,
];

/// Deterministic spread of inputs: every combination of a few approach counts, cycle lengths, and
/// green times, with directions dropped in a rotating pattern.
fn timing_records() -> Vec<IntersectionTimingRecord> {
    let mut records = Vec::new();
    for num_approaches in 1..=4 {
        for (case, cycle) in [45.0, 60.0, 97.5, 120.0].into_iter().enumerate() {
            let mut signal_info = BTreeMap::new();
            let mut in_links = BTreeMap::new();
            for approach in 0..num_approaches {
                let mut per_dir = BTreeMap::new();
                for (idx, dir) in DIRECTIONS.into_iter().enumerate() {
                    if (approach + idx + case) % 3 == 0 {
                        continue;
                    }
                    let green = 5.0 + ((approach * 7 + idx * 3 + case * 5) % 17) as f64;
                    per_dir.insert(
                        dir,
                        TimingGroup {
                            green_time: green,
                            cycle_time: cycle - approach as f64,
                            red_time: 0.0,
                            start_time: 0.0,
                            end_time: 0.0,
                        },
                    );
                }
                signal_info.insert(Approach(approach), per_dir);
                in_links.insert(
                    Approach(approach),
                    vec![LinkID(format!("{}-{}", num_approaches, approach))],
                );
            }
            records.push(IntersectionTimingRecord {
                intersection_id: IntersectionID(format!("{}-{}", num_approaches, case)),
                signal_info,
                in_links,
                out_links: Vec::new(),
                link_info: BTreeMap::new(),
            });
        }
    }
    records
}

#[test]
fn built_plans_walk_exactly_one_cycle() {
    for record in timing_records() {
        let plan = build_phases(&record, &PlanOptions::default()).unwrap();

        // Each distinct start is one slot, lasting as long as its longest green
        let mut slots: BTreeMap<u64, f64> = BTreeMap::new();
        for phase in &plan.phases {
            assert!(phase.green_start >= 0.0 && phase.green_start < plan.cycle_length);
            assert_eq!(phase.cycle_length, plan.cycle_length);
            let slot = slots.entry(phase.green_start.to_bits()).or_insert(0.0);
            *slot = slot.max(phase.green_time);
        }
        let walked: f64 = slots.values().map(|green| green + plan.clearance).sum();
        assert!(
            (walked - plan.cycle_length).abs() < 1e-6,
            "{} walks {} of {}",
            record.intersection_id,
            walked,
            plan.cycle_length
        );
    }
}

fn all_approaches() -> ConflictTable {
    ConflictTable::standard(&[Approach(0), Approach(1), Approach(2), Approach(3)])
}

fn plans_as_phases() -> Vec<(IntersectionID, Vec<Phase>)> {
    timing_records()
        .into_iter()
        .map(|record| {
            let plan = build_phases(&record, &PlanOptions::default()).unwrap();
            (plan.intersection, plan.phases)
        })
        .collect()
}

fn check_no_overlaps(resolution: &Resolution, table: &ConflictTable) {
    for (idx1, idx2) in resolution.remaining_conflicts(table) {
        panic!(
            "{}: {} and {} are still green together",
            resolution.intersection,
            resolution.phases[idx1].movement,
            resolution.phases[idx2].movement
        );
    }
}

#[test]
fn resolved_plans_have_no_conflicts() {
    let table = all_approaches();
    let opts = PlanOptions {
        always_resolve: true,
        ..PlanOptions::default()
    };
    let resolver = ConflictResolver::new(&table, &opts);
    let mut resolved = 0;
    for (id, phases) in plans_as_phases() {
        // Scramble the starts, so the resolver has real work to do
        let scrambled: Vec<Phase> = phases
            .into_iter()
            .enumerate()
            .map(|(idx, p)| Phase {
                green_start: (idx as f64) * 13.0,
                ..p
            })
            .collect();
        match resolver.resolve(&id, &scrambled) {
            Ok(resolution) => {
                resolved += 1;
                check_no_overlaps(&resolution, &table);
                assert_eq!(resolution.phases.len(), scrambled.len());
            }
            Err(err) => assert_eq!(err.kind(), "infeasible_cycle", "{}", err),
        }
    }
    assert!(resolved > 0);
}

#[test]
fn resolving_twice_changes_nothing() {
    let table = all_approaches();
    let resolver = ConflictResolver::new(&table, &PlanOptions::default());
    for (id, phases) in plans_as_phases() {
        let first = match resolver.resolve(&id, &phases) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let second = resolver.resolve(&id, &first.phases).unwrap();
        assert_eq!(first.phases, second.phases, "{}", id);
        assert_eq!(first.merges, second.merges);
    }
}

fn phase(approach: usize, direction: Direction, start: f64, green: f64, count: usize) -> Phase {
    Phase {
        movement: MovementID::new(approach, direction),
        green_start: start,
        green_time: green,
        cycle_length: 60.0,
        link_ids: Vec::new(),
        provenance: Provenance {
            vehicle_count: count,
            ..Provenance::default()
        },
    }
}

#[test]
fn duplicates_resolve_the_same_in_any_order() {
    let table = ConflictTable::two_way();
    let resolver = ConflictResolver::new(&table, &PlanOptions::default());
    let id = IntersectionID::from("dupes");
    let phases = vec![
        phase(0, Direction::Straight, 50.0, 15.0, 40),
        phase(0, Direction::Straight, 10.0, 18.0, 12),
        phase(0, Direction::Left, 0.0, 9.0, 3),
        phase(1, Direction::Straight, 5.0, 20.0, 30),
        phase(1, Direction::Straight, 25.0, 22.0, 31),
    ];
    let forwards = resolver.resolve(&id, &phases).unwrap();
    let mut reversed_input = phases.clone();
    reversed_input.reverse();
    let mut backwards = resolver.resolve(&id, &reversed_input).unwrap();
    backwards.phases.reverse();

    assert_eq!(forwards.phases, backwards.phases);

    // The busiest straight on way 0 starts at 50, so the walk wraps around
    let a0_straight = &forwards.phases[0];
    assert_eq!(a0_straight.green_start, 50.0);
    assert_eq!(
        a0_straight.interval().segments(),
        vec![(50.0, 10.0), (0.0, 5.0)]
    );
    // 50 + 16 wraps to 6, then 6 + 10
    assert_eq!(forwards.phases[2].green_start, 6.0);
    assert_eq!(forwards.phases[3].green_start, 16.0);
    assert_eq!(forwards.phases[3].green_time, 22.0);
}

#[test]
fn green_time_survives_the_wrap() {
    for (start, green) in [(55.0, 10.0), (30.0, 30.0), (59.5, 45.25), (0.0, 60.0)] {
        let p = phase(0, Direction::Left, start, green, 0);
        let total: f64 = p.interval().segments().iter().map(|(_, len)| len).sum();
        assert!((total - green).abs() < 1e-9);
        assert!(p.interval().segments().len() <= 2);
    }
}

#[test]
fn link_offsets_count_backwards() {
    let record = &timing_records()[4];
    let plan = build_phases(record, &PlanOptions::default()).unwrap();
    for phase in &plan.phases {
        let backward = BackwardOffset::from_forward(phase.green_start, plan.cycle_length);
        assert!((backward.to_forward(plan.cycle_length) - phase.green_start).abs() < 1e-9);
    }
}

fn resolver_input() -> BTreeMap<IntersectionID, serde_json::Value> {
    plans_as_phases()
        .into_iter()
        .map(|(id, phases)| {
            let records: Vec<PhaseRecord> = phases
                .iter()
                .map(|p| PhaseRecord {
                    green_start: 0.0,
                    ..p.to_record()
                })
                .collect();
            (id, serde_json::to_value(records).unwrap())
        })
        .collect()
}

#[test]
fn batches_are_deterministic() {
    let table = all_approaches();
    let opts = PlanOptions::default();
    let run = || {
        let outcome = batch::resolve_all(resolver_input(), &table, &opts, &mut Timer::throwaway());
        let out: BTreeMap<IntersectionID, Vec<PhaseRecord>> = outcome
            .succeeded
            .iter()
            .map(|r| (r.intersection.clone(), r.to_records()))
            .collect();
        let failed: Vec<String> = outcome.failed.iter().map(|e| e.to_string()).collect();
        (abstutil::to_json(&out), failed)
    };
    let (json1, failed1) = run();
    let (json2, failed2) = run();
    assert_eq!(json1, json2);
    assert_eq!(failed1, failed2);
}
