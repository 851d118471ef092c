use std::collections::BTreeMap;

use traffic_signal_data::{Light, LinkSignal, LinkTopology};

use crate::make::PhasePlan;
use crate::{BackwardOffset, Direction, LinkID, SignalError};

/// What one incoming link's signal shows for one direction.
struct LinkLight {
    direction: Direction,
    green_time: f64,
    initial_phase: BackwardOffset,
}

impl PhasePlan {
    /// Expresses the plan per physical incoming link. Each link gets one light per downstream
    /// link it can reach with a planned direction, with offsets counted back from the end of the
    /// cycle. Fails without producing anything if a planned link has no known topology.
    pub fn link_signals(
        &self,
        link_info: &BTreeMap<LinkID, LinkTopology>,
    ) -> Result<Vec<LinkSignal>, SignalError> {
        // Keep links in the order the plan first mentions them
        let mut order: Vec<&LinkID> = Vec::new();
        let mut lights_per_link: BTreeMap<&LinkID, Vec<LinkLight>> = BTreeMap::new();
        for phase in &self.phases {
            for link in &phase.link_ids {
                let lights = lights_per_link.entry(link).or_insert_with(|| {
                    order.push(link);
                    Vec::new()
                });
                lights.push(LinkLight {
                    direction: phase.movement.direction,
                    green_time: phase.green_time,
                    initial_phase: BackwardOffset::from_forward(
                        phase.green_start,
                        self.cycle_length,
                    ),
                });
            }
        }

        let mut results = Vec::new();
        for link in order {
            let topology = link_info.get(link).ok_or_else(|| {
                SignalError::malformed(
                    &self.intersection,
                    format!("link {} isn't in the link direction map", link),
                )
            })?;

            let mut lights = Vec::new();
            for (out_link, dir) in &topology.dir {
                for light in &lights_per_link[link] {
                    if light.direction == *dir {
                        lights.push(Light {
                            out_link_id: out_link.clone(),
                            period: self.cycle_length,
                            green_time: light.green_time,
                            initial_phase: light.initial_phase.inner_seconds(),
                        });
                    }
                }
            }

            results.push(LinkSignal {
                link_id: link.clone(),
                out_top: topology
                    .dir
                    .keys()
                    .map(|l| l.0.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                lights,
            });
        }
        Ok(results)
    }
}
