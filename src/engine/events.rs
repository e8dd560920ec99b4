//! The event stream of the simulation and the handler registry.
use crate::population::PersonId;
use crate::units::Money;
use std::collections::VecDeque;

/// An event of the simulated day.
///
/// Events of a single agent arrive in happens-before order with respect to that agent's
/// simulated timeline; no ordering is guaranteed across agents.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An agent finished an activity
    ActivityEnd {
        /// Time of day in seconds
        time: f64,
        /// The agent
        person: PersonId,
        /// The activity type
        act_type: String,
    },
    /// An agent departed on a leg
    PersonDeparture {
        /// Time of day in seconds
        time: f64,
        /// The agent
        person: PersonId,
        /// The leg mode
        mode: String,
    },
    /// An agent arrived at the end of a leg
    PersonArrival {
        /// Time of day in seconds
        time: f64,
        /// The agent
        person: PersonId,
        /// The leg mode
        mode: String,
        /// Distance travelled on the leg, in metres
        distance: f64,
    },
    /// An agent started an activity
    ActivityStart {
        /// Time of day in seconds
        time: f64,
        /// The agent
        person: PersonId,
        /// The activity type
        act_type: String,
    },
    /// Money changed hands for an agent
    PersonMoney {
        /// Time of day in seconds
        time: f64,
        /// The agent
        person: PersonId,
        /// The amount; negative values are charges, positive values payments
        amount: Money,
        /// What the transaction was for
        purpose: String,
    },
}

/// Collects events emitted by handlers while they process another event.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Event>,
}

impl EventSink {
    /// Emit an event into the stream.
    ///
    /// The event is dispatched to all handlers after the currently processed event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// The events emitted so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

/// A handler observing the event stream.
pub trait EventHandler {
    /// Process a single event. Emitted follow-up events go through `sink`.
    fn handle_event(&mut self, event: &Event, sink: &mut EventSink);

    /// Reset per-iteration state. Called before each iteration starts.
    fn reset(&mut self, _iteration: u32) {}
}

/// Owns the registered event handlers and dispatches events to them.
///
/// Dispatch is serial and depth-one: events emitted by handlers are queued and processed after
/// the triggering event, in emission order. All monetary events that pass through are kept for
/// the current iteration so the controller can persist them.
#[derive(Default)]
pub struct EventsManager {
    handlers: Vec<Box<dyn EventHandler>>,
    money_events: Vec<Event>,
}

impl EventsManager {
    /// Create an events manager with no handlers.
    pub fn new() -> EventsManager {
        EventsManager::default()
    }

    /// Register an event handler.
    pub fn add_handler(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Dispatch an event, and transitively everything the handlers emit in response.
    pub fn process_event(&mut self, event: Event) {
        let mut queue = VecDeque::new();
        queue.push_back(event);

        while let Some(event) = queue.pop_front() {
            if matches!(event, Event::PersonMoney { .. }) {
                self.money_events.push(event.clone());
            }

            let mut sink = EventSink::default();
            for handler in &mut self.handlers {
                handler.handle_event(&event, &mut sink);
            }
            queue.extend(sink.events);
        }
    }

    /// Reset all handlers and drop the monetary events of the previous iteration.
    pub fn reset_handlers(&mut self, iteration: u32) {
        self.money_events.clear();
        for handler in &mut self.handlers {
            handler.reset(iteration);
        }
    }

    /// The monetary events observed since the last reset.
    pub fn money_events(&self) -> &[Event] {
        &self.money_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A handler that answers every arrival with a fixed monetary event.
    struct TollBooth;

    impl EventHandler for TollBooth {
        fn handle_event(&mut self, event: &Event, sink: &mut EventSink) {
            if let Event::PersonArrival { time, person, .. } = event {
                sink.emit(Event::PersonMoney {
                    time: *time,
                    person: person.clone(),
                    amount: Money(-1.0),
                    purpose: "toll".to_string(),
                });
            }
        }
    }

    #[test]
    fn test_emitted_events_are_dispatched_and_recorded() {
        let mut events = EventsManager::new();
        events.add_handler(Box::new(TollBooth));

        events.process_event(Event::PersonArrival {
            time: 8.0 * 3600.0,
            person: "p1".into(),
            mode: "car".to_string(),
            distance: 1000.0,
        });

        assert_eq!(events.money_events().len(), 1);
        let Event::PersonMoney { amount, purpose, .. } = &events.money_events()[0] else {
            panic!("expected a monetary event");
        };
        assert_eq!(*amount, Money(-1.0));
        assert_eq!(purpose, "toll");
    }

    #[test]
    fn test_reset_drops_money_events() {
        let mut events = EventsManager::new();
        events.add_handler(Box::new(TollBooth));
        events.process_event(Event::PersonArrival {
            time: 0.0,
            person: "p1".into(),
            mode: "car".to_string(),
            distance: 0.0,
        });
        events.reset_handlers(1);
        assert!(events.money_events().is_empty());
    }
}
