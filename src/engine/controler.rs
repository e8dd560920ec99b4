//! The simulation controller: the iteration loop of the run.
use crate::engine::events::{Event, EventsManager};
use crate::output::OutputWriters;
use crate::population::PlanElement;
use crate::router::IntermodalMainModeIdentifier;
use crate::scenario::Scenario;
use crate::units::Money;
use anyhow::Result;
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use std::path::PathBuf;

/// Drives the simulation iterations over a prepared scenario.
///
/// Each iteration replays every person's daily plan as an event sequence in deterministic
/// person order and persists the iteration outputs. The mobility simulation proper (vehicle
/// dispatch, congestion, replanning) is the host engine's concern and not reproduced here.
pub struct Controler {
    scenario: Scenario,
    events: EventsManager,
    main_mode_identifier: IntermodalMainModeIdentifier,
    output_path: PathBuf,
}

impl Controler {
    /// Create a controller for a prepared scenario.
    pub fn new(
        scenario: Scenario,
        events: EventsManager,
        main_mode_identifier: IntermodalMainModeIdentifier,
        output_path: PathBuf,
    ) -> Controler {
        Controler {
            scenario,
            events,
            main_mode_identifier,
            output_path,
        }
    }

    /// Run the configured number of iterations.
    pub fn run(mut self) -> Result<()> {
        let dvrp_modes = self
            .scenario
            .config
            .drt
            .modes
            .iter()
            .map(|drt_mode| drt_mode.mode.as_str())
            .join(", ");
        info!("Activating DVRP components for modes: {dvrp_modes}");

        let mut writers = OutputWriters::create(&self.output_path)?;
        let iterations = self.scenario.config.controler.iterations;
        for iteration in 0..iterations {
            info!("Iteration {iteration}");
            self.events.reset_handlers(iteration);
            self.replay_plans();

            writers.write_money_events(iteration, self.events.money_events())?;
            let main_modes = self.count_main_modes();
            writers.write_main_modes(iteration, &main_modes)?;

            let total: Money = self
                .events
                .money_events()
                .iter()
                .filter_map(|event| match event {
                    Event::PersonMoney { amount, .. } => Some(*amount),
                    _ => None,
                })
                .sum();
            info!(
                "Iteration {iteration}: {} monetary events totalling {total}",
                self.events.money_events().len()
            );
        }

        Ok(())
    }

    /// Replay every person's plan as events.
    ///
    /// Per plan element: the activity end, then departure and arrival per leg, then the next
    /// activity's start. The clock advances to each activity's end time and by each leg's
    /// travel time.
    fn replay_plans(&mut self) {
        for person in self.scenario.population.persons.values() {
            let elements = &person.plan.elements;
            let mut now = 0.0_f64;
            for (i, element) in elements.iter().enumerate() {
                match element {
                    PlanElement::Activity(activity) => {
                        if i > 0 {
                            self.events.process_event(Event::ActivityStart {
                                time: now,
                                person: person.id.clone(),
                                act_type: activity.act_type.clone(),
                            });
                        }
                        if i + 1 < elements.len() {
                            if let Some(end_time) = activity.end_time {
                                now = now.max(end_time);
                            }
                            self.events.process_event(Event::ActivityEnd {
                                time: now,
                                person: person.id.clone(),
                                act_type: activity.act_type.clone(),
                            });
                        }
                    }
                    PlanElement::Leg(leg) => {
                        self.events.process_event(Event::PersonDeparture {
                            time: now,
                            person: person.id.clone(),
                            mode: leg.mode.clone(),
                        });
                        now += leg.travel_time;
                        self.events.process_event(Event::PersonArrival {
                            time: now,
                            person: person.id.clone(),
                            mode: leg.mode.clone(),
                            distance: leg.distance,
                        });
                    }
                }
            }
        }
    }

    /// Count the trips of the day by main mode.
    fn count_main_modes(&self) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for person in self.scenario.population.persons.values() {
            for trip in person.plan.trips() {
                let main_mode = self.main_mode_identifier.identify_main_mode(&trip);
                *counts.entry(main_mode).or_insert(0) += 1;
            }
        }

        counts
    }
}
