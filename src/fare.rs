//! Fare compensation for intermodal DRT↔transit trips.
//!
//! Agents combining a DRT leg with a public-transit leg in one trip pay the DRT minimum fare
//! for what is typically a short feeder ride. Without a correction, simulated agents over-avoid
//! DRT as an access/egress mode. This handler credits each such trip the difference between the
//! minimum fare and one kilometre's distance fare, per DRT leg.
use crate::config::DrtFaresConfig;
use crate::engine::{Event, EventHandler, EventSink, is_stage_activity};
use crate::population::PersonId;
use crate::scenario::DRT_TELEPORTATION_SUFFIX;
use crate::units::Money;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::collections::HashMap;

/// The purpose recorded on monetary events emitted by the compensator.
pub const COMPENSATION_PURPOSE: &str = "drtFareCompensation";

/// One leg of an agent's trip in progress.
#[derive(Debug, Clone)]
struct TripLeg {
    mode: String,
    #[allow(dead_code)] // classification ignores distances, but they are part of the record
    distance: f64,
}

/// Event handler crediting agents for trips that combine DRT with public transit.
///
/// Keeps one open trip buffer per agent, fed by leg events and consumed at the first real
/// (non-stage) activity start. State is partitioned strictly by agent; the facade controller
/// dispatches events serially, so no synchronisation is needed.
pub struct DrtFareCompensator {
    /// Compensation per DRT-family mode, including the `_teleportation` variants
    compensation_by_mode: IndexMap<String, Money>,
    /// The modes counting as public transit for trip classification
    pt_modes: IndexSet<String>,
    /// The open trip of each agent
    current_trips: HashMap<PersonId, Vec<TripLeg>>,
    /// Credits emitted in the current iteration
    credits: u64,
}

impl DrtFareCompensator {
    /// Create a compensator.
    ///
    /// # Arguments
    ///
    /// * `compensation_by_mode` - Credit per DRT-family mode, from [`compensation_from_fares`]
    /// * `pt_modes` - Modes counting as public transit
    pub fn new(
        compensation_by_mode: IndexMap<String, Money>,
        pt_modes: IndexSet<String>,
    ) -> DrtFareCompensator {
        DrtFareCompensator {
            compensation_by_mode,
            pt_modes,
            current_trips: HashMap::new(),
            credits: 0,
        }
    }

    /// Classify a finished trip and emit one credit per DRT-family leg if it qualifies.
    ///
    /// A trip qualifies iff it contains at least one DRT-family leg and at least one
    /// public-transit leg; leg order and leg distances are irrelevant.
    fn process_trip(&mut self, person: &PersonId, legs: &[TripLeg], time: f64, sink: &mut EventSink) {
        let has_pt = legs
            .iter()
            .any(|leg| self.pt_modes.contains(leg.mode.as_str()));
        if !has_pt {
            return;
        }

        for leg in legs {
            if let Some(&compensation) = self.compensation_by_mode.get(leg.mode.as_str()) {
                self.credits += 1;
                sink.emit(Event::PersonMoney {
                    time,
                    person: person.clone(),
                    amount: compensation,
                    purpose: COMPENSATION_PURPOSE.to_string(),
                });
            }
        }
    }
}

impl EventHandler for DrtFareCompensator {
    fn handle_event(&mut self, event: &Event, sink: &mut EventSink) {
        match event {
            Event::PersonDeparture { person, mode, .. } => {
                self.current_trips
                    .entry(person.clone())
                    .or_default()
                    .push(TripLeg {
                        mode: mode.clone(),
                        distance: 0.0,
                    });
            }
            Event::PersonArrival {
                person,
                mode,
                distance,
                ..
            } => {
                let matched = match self
                    .current_trips
                    .get_mut(person)
                    .and_then(|legs| legs.last_mut())
                {
                    Some(leg) if leg.mode == *mode => {
                        leg.distance = *distance;
                        true
                    }
                    _ => false,
                };
                if !matched {
                    warn!(
                        "Arrival of {person} on mode {mode} without a matching departure; \
                         dropping the current trip"
                    );
                    self.current_trips.remove(person);
                }
            }
            Event::ActivityStart {
                person,
                act_type,
                time,
            } => {
                if is_stage_activity(act_type) {
                    return;
                }
                if let Some(legs) = self.current_trips.remove(person) {
                    self.process_trip(person, &legs, *time, sink);
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self, iteration: u32) {
        for person in self.current_trips.keys() {
            debug!("Discarding unterminated trip of {person}");
        }
        self.current_trips.clear();
        if self.credits > 0 {
            debug!("Emitted {} compensation credits before iteration {iteration}", self.credits);
        }
        self.credits = 0;
    }
}

/// Derive the per-mode compensation scalars from the DRT fares configuration.
///
/// Each DRT mode is compensated `minFarePerTrip − distanceFarePerMetre × 1000`, i.e. the
/// minimum fare less the distance fare of one kilometre. The host engine may replace DRT legs
/// with a straight-line teleport under its speed-up configuration, so the teleported variant of
/// each mode carries the same compensation.
pub fn compensation_from_fares(fares: &DrtFaresConfig) -> IndexMap<String, Money> {
    let mut compensation_by_mode = IndexMap::new();
    for fare in &fares.fares {
        let compensation = Money(fare.min_fare_per_trip - fare.distance_fare_per_m * 1000.0);
        compensation_by_mode.insert(fare.mode.clone(), compensation);
        compensation_by_mode.insert(
            format!("{}{}", fare.mode, DRT_TELEPORTATION_SUFFIX),
            compensation,
        );
    }

    compensation_by_mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DrtFareConfig;
    use float_cmp::approx_eq;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};

    #[fixture]
    fn compensator() -> DrtFareCompensator {
        DrtFareCompensator::new(
            indexmap! {
                "drt".to_string() => Money(-2.0),
                "drt_teleportation".to_string() => Money(-2.0),
            },
            ["pt".to_string()].into_iter().collect(),
        )
    }

    /// Feed a whole trip (legs, then the terminating activity) through the compensator and
    /// return the emitted credits.
    fn run_trip(compensator: &mut DrtFareCompensator, modes: &[&str]) -> Vec<Money> {
        let person: PersonId = "p1".into();
        let mut sink = EventSink::default();
        for (i, mode) in modes.iter().enumerate() {
            compensator.handle_event(
                &Event::PersonDeparture {
                    time: i as f64 * 600.0,
                    person: person.clone(),
                    mode: (*mode).to_string(),
                },
                &mut sink,
            );
            compensator.handle_event(
                &Event::PersonArrival {
                    time: i as f64 * 600.0 + 300.0,
                    person: person.clone(),
                    mode: (*mode).to_string(),
                    distance: 1000.0,
                },
                &mut sink,
            );
            // stage activities between the legs of the trip must not end it
            if i + 1 < modes.len() {
                compensator.handle_event(
                    &Event::ActivityStart {
                        time: i as f64 * 600.0 + 300.0,
                        person: person.clone(),
                        act_type: "pt interaction".to_string(),
                    },
                    &mut sink,
                );
            }
        }
        compensator.handle_event(
            &Event::ActivityStart {
                time: 7200.0,
                person,
                act_type: "work".to_string(),
            },
            &mut sink,
        );

        sink.events()
            .iter()
            .filter_map(|event| match event {
                Event::PersonMoney { amount, .. } => Some(*amount),
                _ => None,
            })
            .collect()
    }

    #[rstest]
    fn test_drt_with_pt_is_credited_once(mut compensator: DrtFareCompensator) {
        let credits = run_trip(&mut compensator, &["walk", "drt", "pt", "walk"]);
        assert_eq!(credits, vec![Money(-2.0)]);
    }

    #[rstest]
    fn test_pt_only_trip_gets_no_credit(mut compensator: DrtFareCompensator) {
        let credits = run_trip(&mut compensator, &["walk", "pt", "walk"]);
        assert!(credits.is_empty());
    }

    #[rstest]
    fn test_drt_only_trip_gets_no_credit(mut compensator: DrtFareCompensator) {
        let credits = run_trip(&mut compensator, &["drt"]);
        assert!(credits.is_empty());
    }

    #[rstest]
    fn test_each_drt_family_leg_is_credited(mut compensator: DrtFareCompensator) {
        let credits = run_trip(&mut compensator, &["drt_teleportation", "pt", "drt"]);
        assert_eq!(credits, vec![Money(-2.0), Money(-2.0)]);
    }

    #[rstest]
    fn test_zero_distance_drt_leg_still_qualifies(mut compensator: DrtFareCompensator) {
        let person: PersonId = "p1".into();
        let mut sink = EventSink::default();
        for (mode, distance) in [("drt", 0.0), ("pt", 8000.0)] {
            compensator.handle_event(
                &Event::PersonDeparture {
                    time: 0.0,
                    person: person.clone(),
                    mode: mode.to_string(),
                },
                &mut sink,
            );
            compensator.handle_event(
                &Event::PersonArrival {
                    time: 0.0,
                    person: person.clone(),
                    mode: mode.to_string(),
                    distance,
                },
                &mut sink,
            );
        }
        compensator.handle_event(
            &Event::ActivityStart {
                time: 0.0,
                person,
                act_type: "home".to_string(),
            },
            &mut sink,
        );

        assert_eq!(sink.events().len(), 1);
    }

    #[rstest]
    fn test_unterminated_trip_is_discarded_on_reset(mut compensator: DrtFareCompensator) {
        let person: PersonId = "p1".into();
        let mut sink = EventSink::default();
        compensator.handle_event(
            &Event::PersonDeparture {
                time: 0.0,
                person: person.clone(),
                mode: "drt".to_string(),
            },
            &mut sink,
        );
        compensator.reset(1);

        // A later activity start must not emit anything for the discarded trip
        compensator.handle_event(
            &Event::ActivityStart {
                time: 0.0,
                person,
                act_type: "home".to_string(),
            },
            &mut sink,
        );
        assert!(sink.events().is_empty());
    }

    #[rstest]
    fn test_arrival_without_departure_drops_trip(mut compensator: DrtFareCompensator) {
        let person: PersonId = "p1".into();
        let mut sink = EventSink::default();
        compensator.handle_event(
            &Event::PersonDeparture {
                time: 0.0,
                person: person.clone(),
                mode: "drt".to_string(),
            },
            &mut sink,
        );
        // arrival on a different mode than the open leg
        compensator.handle_event(
            &Event::PersonArrival {
                time: 60.0,
                person: person.clone(),
                mode: "pt".to_string(),
                distance: 500.0,
            },
            &mut sink,
        );
        compensator.handle_event(
            &Event::ActivityStart {
                time: 120.0,
                person,
                act_type: "home".to_string(),
            },
            &mut sink,
        );

        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_compensation_from_fares() {
        let fares = DrtFaresConfig {
            fares: vec![DrtFareConfig {
                mode: "drt".to_string(),
                base_fare: 1.0,
                min_fare_per_trip: 4.0,
                distance_fare_per_m: 0.006,
                time_fare_per_h: 0.0,
            }],
        };

        let compensation_by_mode = compensation_from_fares(&fares);
        assert_eq!(compensation_by_mode.len(), 2);
        let compensation = compensation_by_mode["drt"];
        assert!(approx_eq!(f64, compensation.0, -2.0, epsilon = 1e-9));
        assert_eq!(compensation_by_mode["drt_teleportation"], compensation);
    }
}
