//! The population: persons and their daily plans.
use crate::engine::is_stage_activity;
use crate::id::define_id_type;
use crate::input::{parse_attributes, read_vec_from_csv};
use crate::utils::try_insert;
use anyhow::{Context, Result, bail, ensure};
use geo::Coord;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

define_id_type!(PersonId);

/// A person with attributes and one selected daily plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    /// The unique identifier of this person
    pub id: PersonId,
    /// Attributes attached to this person (e.g. `canUseDrt`)
    pub attributes: BTreeMap<String, String>,
    /// The selected daily plan
    pub plan: Plan,
}

/// An ordered sequence of activities and legs, starting and ending with an activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// The plan elements in daily order
    pub elements: Vec<PlanElement>,
}

/// One element of a daily plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanElement {
    /// Time spent at a location
    Activity(Activity),
    /// Movement between two activities
    Leg(Leg),
}

/// An activity of a daily plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    /// The activity type, e.g. `home` or the synthetic `pt interaction`
    pub act_type: String,
    /// Position in the scenario CRS, if known
    pub coord: Option<Coord<f64>>,
    /// The time of day (seconds) this activity ends, if bounded
    pub end_time: Option<f64>,
}

/// A leg of a daily plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    /// The transport mode of this leg
    pub mode: String,
    /// Distance travelled in metres
    pub distance: f64,
    /// Travel time in seconds
    pub travel_time: f64,
    /// The typed route of this leg
    pub route: Route,
}

/// A leg route, typed per mode family by the route factories.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// An opaque route description owned by the host router
    Generic(String),
    /// A DRT request route
    Drt(DrtRoute),
}

/// The route of a DRT leg: the promised service levels of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct DrtRoute {
    /// Ride time of the direct (unshared) ride, in seconds
    pub direct_ride_time: f64,
    /// Maximum time the passenger may wait for pickup, in seconds
    pub max_wait_time: f64,
}

/// Creates typed routes from their textual form, depending on the leg mode.
///
/// Legs of a registered DRT mode get a [`Route::Drt`]; all other legs keep their raw route
/// string as [`Route::Generic`].
#[derive(Debug, Clone, Default)]
pub struct RouteFactories {
    drt_modes: IndexSet<String>,
}

impl RouteFactories {
    /// Create route factories with a DRT route factory registered for the given modes.
    pub fn with_drt_modes<I: IntoIterator<Item = String>>(drt_modes: I) -> Self {
        Self {
            drt_modes: drt_modes.into_iter().collect(),
        }
    }

    /// Create the typed route for a leg of the given mode.
    pub fn create_route(&self, mode: &str, raw: &str) -> Result<Route> {
        if !self.drt_modes.contains(mode) {
            return Ok(Route::Generic(raw.to_string()));
        }

        let fields = parse_attributes(raw)
            .with_context(|| format!("Invalid route description for a {mode} leg"))?;
        let read_field = |name: &str| -> Result<f64> {
            let value = fields
                .get(name)
                .with_context(|| format!("Route of a {mode} leg is missing field {name}"))?;
            value
                .parse()
                .with_context(|| format!("Route field {name} is not a number"))
        };

        Ok(Route::Drt(DrtRoute {
            direct_ride_time: read_field("directRideTime")?,
            max_wait_time: read_field("maxWaitTime")?,
        }))
    }
}

/// The population of the scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    /// All persons, keyed by ID, in file order
    pub persons: IndexMap<PersonId, Person>,
}

/// Represents a row of the persons CSV file
#[derive(Debug, Deserialize)]
struct PersonRow {
    id: String,
    /// Flattened attribute list, e.g. `"canUseDrt=true"`
    #[serde(default)]
    attributes: String,
}

/// Represents a row of the plans CSV file; one row per plan element, in daily order
#[derive(Debug, Deserialize)]
struct PlanRow {
    person_id: String,
    /// `activity` or `leg`
    element: String,
    act_type: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    end_time: Option<f64>,
    mode: Option<String>,
    distance: Option<f64>,
    travel_time: Option<f64>,
    route: Option<String>,
}

impl Population {
    /// Read a population from persons and plans CSV files.
    ///
    /// # Arguments
    ///
    /// * `persons_file_path` - Path to the persons CSV file
    /// * `plans_file_path` - Path to the plans CSV file
    /// * `route_factories` - Factories turning the textual route column into typed routes
    pub fn from_csv(
        persons_file_path: &Path,
        plans_file_path: &Path,
        route_factories: &RouteFactories,
    ) -> Result<Population> {
        let mut population = Population::default();

        for row in read_vec_from_csv::<PersonRow>(persons_file_path)? {
            let person = Person {
                id: PersonId::new(&row.id),
                attributes: parse_attributes(&row.attributes)
                    .with_context(|| format!("Invalid attributes for person {}", row.id))?,
                plan: Plan::default(),
            };
            try_insert(&mut population.persons, person.id.clone(), person)
                .with_context(|| format!("Duplicate person in {}", persons_file_path.display()))?;
        }

        for row in read_vec_from_csv::<PlanRow>(plans_file_path)? {
            let element = plan_element_from_row(&row, route_factories)
                .with_context(|| format!("Invalid plan element for person {}", row.person_id))?;
            let person = population
                .persons
                .get_mut(row.person_id.as_str())
                .with_context(|| {
                    format!(
                        "Plan element references unknown person {}",
                        row.person_id
                    )
                })?;
            person.plan.elements.push(element);
        }

        for person in population.persons.values() {
            check_plan(&person.plan)
                .with_context(|| format!("Invalid plan for person {}", person.id))?;
        }

        Ok(population)
    }
}

/// Build a single plan element from its CSV row.
fn plan_element_from_row(row: &PlanRow, route_factories: &RouteFactories) -> Result<PlanElement> {
    match row.element.as_str() {
        "activity" => {
            let act_type = row.act_type.clone().context("Activity has no act_type")?;
            let coord = match (row.x, row.y) {
                (Some(x), Some(y)) => Some(Coord { x, y }),
                (None, None) => None,
                _ => bail!("Activity has only one of x and y"),
            };
            Ok(PlanElement::Activity(Activity {
                act_type,
                coord,
                end_time: row.end_time,
            }))
        }
        "leg" => {
            let mode = row.mode.clone().context("Leg has no mode")?;
            let distance = row.distance.context("Leg has no distance")?;
            let travel_time = row.travel_time.context("Leg has no travel_time")?;
            ensure!(distance >= 0.0, "Leg distance must be non-negative");
            ensure!(travel_time >= 0.0, "Leg travel_time must be non-negative");
            let route = route_factories.create_route(&mode, row.route.as_deref().unwrap_or(""))?;
            Ok(PlanElement::Leg(Leg {
                mode,
                distance,
                travel_time,
                route,
            }))
        }
        other => bail!("Unknown plan element kind '{other}'"),
    }
}

/// Check that a plan alternates activities and legs, starting and ending with an activity.
///
/// An empty plan (a person who stays home without a recorded activity) is allowed.
fn check_plan(plan: &Plan) -> Result<()> {
    if plan.elements.is_empty() {
        return Ok(());
    }

    for (i, element) in plan.elements.iter().enumerate() {
        let expect_activity = i % 2 == 0;
        let is_activity = matches!(element, PlanElement::Activity(_));
        ensure!(
            is_activity == expect_activity,
            "Plan does not alternate activities and legs at element {i}"
        );
    }
    ensure!(
        matches!(plan.elements.last(), Some(PlanElement::Activity(_))),
        "Plan must end with an activity"
    );

    Ok(())
}

impl Plan {
    /// The trips of this plan: maximal leg sequences separated by real activities.
    ///
    /// Legs separated only by stage activities belong to the same trip. Trailing legs not
    /// terminated by a real activity are not returned (the trip never ended).
    pub fn trips(&self) -> Vec<Vec<&Leg>> {
        let mut trips = Vec::new();
        let mut current = Vec::new();
        for element in &self.elements {
            match element {
                PlanElement::Leg(leg) => current.push(leg),
                PlanElement::Activity(activity) => {
                    if !is_stage_activity(&activity.act_type) && !current.is_empty() {
                        trips.push(std::mem::take(&mut current));
                    }
                }
            }
        }

        trips
    }
}
