//! Code for assembling and preparing the scenario.
use crate::config::Config;
use crate::network::Network;
use crate::population::{Population, RouteFactories};
use crate::prepare;
use crate::service_area::ServiceArea;
use crate::transit::TransitSchedule;
use crate::vehicles::DrtFleet;
use anyhow::{Context, Result, ensure};
use log::info;
use std::collections::HashSet;

/// The stop attribute marking DRT access/egress candidates for the intermodal router.
pub const DRT_STOP_FILTER_ATTRIBUTE: &str = "drtStopFilter";
/// The value written to [`DRT_STOP_FILTER_ATTRIBUTE`].
pub const DRT_STOP_FILTER_VALUE: &str = "station_S/U/RE/RB_drtServiceArea";
/// The stop attribute marking rail stations in the input transit schedule.
pub const PT_STOP_FILTER_ATTRIBUTE: &str = "stopFilter";
/// The value of [`PT_STOP_FILTER_ATTRIBUTE`] marking S/U/RE/RB rail stations.
pub const PT_STOP_FILTER_VALUE: &str = "station_S/U/RE/RB";
/// The person attribute enabling intermodal DRT routing for that person.
pub const CAN_USE_DRT_ATTRIBUTE: &str = "canUseDrt";
/// The value of [`CAN_USE_DRT_ATTRIBUTE`] enabling intermodal DRT routing.
pub const CAN_USE_DRT_VALUE: &str = "true";
/// The routing mode combining pt with DRT access/egress.
pub const ROUTING_MODE_PT_WITH_DRT: &str = "pt_w_drt";
/// The mode-name suffix the host engine uses when it replaces DRT legs with a straight-line
/// teleport under its speed-up configuration.
pub const DRT_TELEPORTATION_SUFFIX: &str = "_teleportation";

/// How far outside the service area a rail station may lie and still be tagged.
///
/// Some stations are located slightly outside the service-area polygon (e.g. U7 Neukoelln, U8
/// Hermannstr.). Tagging them does not mean a DRT vehicle picks passengers up outside the
/// service area; the passenger walks the last few metres between the DRT stop and the station.
pub const STOP_TAGGING_BUFFER_METRES: f64 = 200.0;

/// The scenario: configuration plus all loaded input data.
///
/// Owned mutably during the setup phase only; the controller reads it for the rest of the run.
pub struct Scenario {
    /// The configuration the scenario was built from
    pub config: Config,
    /// The road network
    pub network: Network,
    /// The transit schedule
    pub transit_schedule: TransitSchedule,
    /// The population
    pub population: Population,
    /// One vehicle fleet per configured DRT mode
    pub fleets: Vec<DrtFleet>,
}

impl Scenario {
    /// Load all scenario inputs named by the configuration.
    ///
    /// A DRT route factory is registered for every configured DRT mode, so DRT legs in the
    /// plans get typed routes.
    pub fn from_config(config: Config) -> Result<Scenario> {
        let network = Network::from_csv(&config.network.nodes_file, &config.network.links_file)
            .context("Failed to load network.")?;
        info!(
            "Loaded network with {} nodes and {} links",
            network.nodes.len(),
            network.links.len()
        );

        let route_factories =
            RouteFactories::with_drt_modes(config.drt.modes.iter().map(|m| m.mode.clone()));
        let population = Population::from_csv(
            &config.plans.persons_file,
            &config.plans.plans_file,
            &route_factories,
        )
        .context("Failed to load population.")?;
        info!("Loaded population with {} persons", population.persons.len());

        let transit_schedule = TransitSchedule::from_csv(&config.transit.stops_file)
            .context("Failed to load transit schedule.")?;
        info!(
            "Loaded transit schedule with {} stops",
            transit_schedule.stops.len()
        );

        let fleets = config
            .drt
            .modes
            .iter()
            .map(|drt_mode| {
                DrtFleet::from_csv(
                    &drt_mode.vehicles_file,
                    &drt_mode.mode,
                    drt_mode.vehicle_capacity,
                )
            })
            .collect::<Result<Vec<_>>>()
            .context("Failed to load DRT fleets.")?;

        Ok(Scenario {
            config,
            network,
            transit_schedule,
            population,
            fleets,
        })
    }

    /// Run the preparation pipeline.
    ///
    /// For every DRT mode with a service-area shapefile, the network is augmented and rail
    /// stations within the buffered service area are tagged as DRT access/egress candidates.
    /// Mutates the scenario exclusively; must not run concurrently with the simulation.
    pub fn prepare(&mut self) -> Result<()> {
        let mut augmented_modes = HashSet::new();
        for drt_mode in &self.config.drt.modes {
            let Some(shapefile) = &drt_mode.service_area_shapefile else {
                info!(
                    "DRT mode {} has no service area; leaving the network unchanged",
                    drt_mode.mode
                );
                continue;
            };

            let service_area = ServiceArea::from_shapefile(shapefile).with_context(|| {
                format!("Failed to load the service area of DRT mode {}", drt_mode.mode)
            })?;
            prepare::network::add_drt_mode(&mut self.network, &drt_mode.mode, &service_area)?;
            prepare::stops::tag_transit_stops(
                &mut self.transit_schedule,
                PT_STOP_FILTER_ATTRIBUTE,
                PT_STOP_FILTER_VALUE,
                DRT_STOP_FILTER_ATTRIBUTE,
                DRT_STOP_FILTER_VALUE,
                &service_area,
                STOP_TAGGING_BUFFER_METRES,
            );
            augmented_modes.insert(drt_mode.mode.as_str());
        }

        self.check_fleets(&augmented_modes)?;

        let eligible = self
            .population
            .persons
            .values()
            .filter(|person| {
                person
                    .attributes
                    .get(CAN_USE_DRT_ATTRIBUTE)
                    .is_some_and(|value| value == CAN_USE_DRT_VALUE)
            })
            .count();
        info!(
            "{eligible} of {} persons may use DRT for transit access/egress",
            self.population.persons.len()
        );

        Ok(())
    }

    /// Check that every vehicle starts on a usable link.
    ///
    /// For augmented modes the start link must carry the fleet's mode; the connectivity repair
    /// may have stripped it from a stranded link, and failing here beats stranding vehicles at
    /// runtime.
    fn check_fleets(&self, augmented_modes: &HashSet<&str>) -> Result<()> {
        for fleet in &self.fleets {
            for vehicle in fleet.vehicles.values() {
                let link = self.network.links.get(&vehicle.start_link).with_context(|| {
                    format!(
                        "Vehicle {} starts on unknown link {}",
                        vehicle.id, vehicle.start_link
                    )
                })?;
                if augmented_modes.contains(fleet.mode.as_str()) {
                    ensure!(
                        link.allowed_modes.contains(fleet.mode.as_str()),
                        "Vehicle {} of mode {} starts on link {}, which is outside the \
                         connected service area",
                        vehicle.id,
                        fleet.mode,
                        link.id
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        assert_error, minimal_config, network_from_links, stop, write_square_shapefile,
    };
    use crate::network::LinkId;
    use crate::vehicles::{DrtVehicle, VehicleId};
    use indexmap::IndexMap;
    use tempfile::tempdir;

    /// A scenario around a two-link bidirectional network inside a 100x100 service area.
    fn scenario_with_service_area() -> (tempfile::TempDir, Scenario) {
        let dir = tempdir().unwrap();
        let shapefile_path = dir.path().join("service_area.shp");
        write_square_shapefile(&shapefile_path, 0.0, 100.0);

        let mut config = minimal_config();
        config.drt.modes[0].service_area_shapefile = Some(shapefile_path);

        let network = network_from_links(
            &[("n1", 10.0, 10.0), ("n2", 20.0, 10.0), ("n3", 500.0, 500.0), ("n4", 510.0, 500.0)],
            &[
                ("l1", "n1", "n2", "car"),
                ("l2", "n2", "n1", "car"),
                // a detached pair far outside the area
                ("l3", "n3", "n4", "car"),
                ("l4", "n4", "n3", "car"),
            ],
        );

        let mut transit_schedule = TransitSchedule::default();
        let station = stop(
            "s1",
            150.0,
            10.0,
            &[(PT_STOP_FILTER_ATTRIBUTE, PT_STOP_FILTER_VALUE)],
        );
        transit_schedule.stops.insert(station.id.clone(), station);

        let scenario = Scenario {
            config,
            network,
            transit_schedule,
            population: Population::default(),
            fleets: Vec::new(),
        };

        (dir, scenario)
    }

    fn fleet_starting_on(link: &str) -> DrtFleet {
        let vehicle = DrtVehicle {
            id: VehicleId::new("v1"),
            start_link: LinkId::new(link),
            service_begin: 0.0,
            service_end: 86400.0,
        };
        DrtFleet {
            mode: "drt".to_string(),
            capacity: 4,
            vehicles: IndexMap::from_iter([(vehicle.id.clone(), vehicle)]),
        }
    }

    #[test]
    fn test_prepare_augments_network_and_tags_stops() {
        let (_dir, mut scenario) = scenario_with_service_area();
        scenario.fleets = vec![fleet_starting_on("l1")];

        scenario.prepare().unwrap();

        assert!(scenario.network.links["l1"].allowed_modes.contains("drt"));
        assert!(scenario.network.links["l2"].allowed_modes.contains("drt"));
        // the detached pair is outside the area and never gains the mode
        assert!(!scenario.network.links["l3"].allowed_modes.contains("drt"));
        // the station 50 m outside the polygon is within the 200 m buffer
        assert_eq!(
            scenario.transit_schedule.stops["s1"]
                .attributes
                .get(DRT_STOP_FILTER_ATTRIBUTE)
                .unwrap(),
            DRT_STOP_FILTER_VALUE
        );
    }

    #[test]
    fn test_prepare_rejects_vehicle_outside_service_area() {
        let (_dir, mut scenario) = scenario_with_service_area();
        scenario.fleets = vec![fleet_starting_on("l3")];

        assert_error!(
            scenario.prepare(),
            "Vehicle v1 of mode drt starts on link l3, which is outside the \
             connected service area"
        );
    }

    #[test]
    fn test_prepare_without_service_area_leaves_network_unchanged(){
        let (_dir, mut scenario) = scenario_with_service_area();
        scenario.config.drt.modes[0].service_area_shapefile = None;
        scenario.fleets = vec![fleet_starting_on("l1")];

        scenario.prepare().unwrap();

        assert!(!scenario.network.links["l1"].allowed_modes.contains("drt"));
        assert!(
            !scenario.transit_schedule.stops["s1"]
                .attributes
                .contains_key(DRT_STOP_FILTER_ATTRIBUTE)
        );
    }
}
