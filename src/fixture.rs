//! Fixtures for tests

use crate::config::{
    Config, ControlerConfig, DrtFareConfig, DrtFaresConfig, DrtModeConfig, DvrpConfig,
    MultiModeDrtConfig, NetworkConfig, PlansConfig, PtIntermodalRoutingModesConfig, RaptorConfig,
    TransitConfig,
};
use crate::network::{Link, LinkId, Network, Node, NodeId};
use crate::population::{Activity, Leg, Person, Plan, PlanElement, Route};
use crate::scenario::{
    DRT_STOP_FILTER_ATTRIBUTE, DRT_STOP_FILTER_VALUE, ROUTING_MODE_PT_WITH_DRT,
};
use crate::service_area::ServiceArea;
use crate::transit::{StopId, TransitStopFacility};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A square service area spanning (0, 0) to (100, 100).
pub fn square_service_area() -> ServiceArea {
    let square = Polygon::new(
        LineString::from(vec![
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 100.0),
            (0.0, 100.0),
            (0.0, 0.0),
        ]),
        vec![],
    );
    ServiceArea::from_multi_polygon(MultiPolygon(vec![square]))
}

/// Write a square polygon spanning (min, min) to (max, max) as a shapefile.
pub fn write_square_shapefile(shapefile_path: &Path, min: f64, max: f64) {
    let ring = shapefile::PolygonRing::Outer(vec![
        shapefile::Point::new(min, min),
        shapefile::Point::new(min, max),
        shapefile::Point::new(max, max),
        shapefile::Point::new(max, min),
        shapefile::Point::new(min, min),
    ]);
    let polygon = shapefile::Polygon::with_rings(vec![ring]);

    let mut writer = shapefile::ShapeWriter::from_path(shapefile_path).unwrap();
    writer.write_shape(&polygon).unwrap();
}

/// Build a network from `(id, x, y)` node tuples and `(id, from, to, modes)` link tuples,
/// where `modes` is a comma-separated list. All links are 100 m long.
pub fn network_from_links(
    nodes: &[(&str, f64, f64)],
    links: &[(&str, &str, &str, &str)],
) -> Network {
    let mut network = Network::default();
    for (id, x, y) in nodes {
        let node = Node {
            id: NodeId::new(id),
            coord: Coord { x: *x, y: *y },
        };
        network.nodes.insert(node.id.clone(), node);
    }
    for (id, from, to, modes) in links {
        let link = Link {
            id: LinkId::new(id),
            from: NodeId::new(from),
            to: NodeId::new(to),
            length: 100.0,
            allowed_modes: modes.split(',').map(str::to_string).collect(),
        };
        network.links.insert(link.id.clone(), link);
    }

    network
}

/// A transit stop facility with the given attributes.
pub fn stop(id: &str, x: f64, y: f64, attributes: &[(&str, &str)]) -> TransitStopFacility {
    TransitStopFacility {
        id: StopId::new(id),
        coord: Coord { x, y },
        attributes: attributes
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

/// A real activity of the given type, without coordinates or an end time.
pub fn activity(act_type: &str) -> Activity {
    Activity {
        act_type: act_type.to_string(),
        coord: None,
        end_time: None,
    }
}

/// A synthetic stage activity between the legs of one trip.
pub fn stage_activity() -> Activity {
    activity("pt interaction")
}

/// A leg with the given mode and distance, five minutes long, with a generic route.
pub fn leg(mode: &str, distance: f64) -> Leg {
    Leg {
        mode: mode.to_string(),
        distance,
        travel_time: 300.0,
        route: Route::Generic(String::new()),
    }
}

/// A person whose day is one intermodal trip: walk, drt, pt, walk between home and work.
pub fn intermodal_person(id: &str) -> Person {
    let mut home = activity("home");
    home.end_time = Some(8.0 * 3600.0);
    Person {
        id: id.into(),
        attributes: [("canUseDrt".to_string(), "true".to_string())]
            .into_iter()
            .collect(),
        plan: Plan {
            elements: vec![
                PlanElement::Activity(home),
                PlanElement::Leg(leg("walk", 500.0)),
                PlanElement::Activity(stage_activity()),
                PlanElement::Leg(leg("drt", 3000.0)),
                PlanElement::Activity(stage_activity()),
                PlanElement::Leg(leg("pt", 10000.0)),
                PlanElement::Activity(stage_activity()),
                PlanElement::Leg(leg("walk", 200.0)),
                PlanElement::Activity(activity("work")),
            ],
        },
    }
}

/// A minimal valid configuration with one DRT mode and no service area.
pub fn minimal_config() -> Config {
    Config {
        controler: ControlerConfig {
            output_directory: "output".into(),
            iterations: 1,
            log_level: None,
        },
        network: NetworkConfig {
            nodes_file: "nodes.csv".into(),
            links_file: "links.csv".into(),
        },
        plans: PlansConfig {
            persons_file: "persons.csv".into(),
            plans_file: "plans.csv".into(),
        },
        transit: TransitConfig {
            stops_file: "transit_stops.csv".into(),
        },
        drt: MultiModeDrtConfig {
            modes: vec![DrtModeConfig {
                mode: "drt".to_string(),
                service_area_shapefile: None,
                vehicles_file: "vehicles_drt.csv".into(),
                vehicle_capacity: 4,
                stop_duration: 60.0,
            }],
        },
        dvrp: DvrpConfig {
            network_mode: "car".to_string(),
            travel_time_estimation_alpha: 0.05,
        },
        drt_fares: DrtFaresConfig {
            fares: vec![DrtFareConfig {
                mode: "drt".to_string(),
                base_fare: 1.0,
                min_fare_per_trip: 4.0,
                distance_fare_per_m: 0.002,
                time_fare_per_h: 0.0,
            }],
        },
        pt_intermodal: PtIntermodalRoutingModesConfig {
            routing_modes: vec![ROUTING_MODE_PT_WITH_DRT.to_string()],
            pt_modes: vec!["pt".to_string()],
        },
        raptor: RaptorConfig {
            use_intermodal_access_egress: true,
            stop_filter_attribute: DRT_STOP_FILTER_ATTRIBUTE.to_string(),
            stop_filter_value: DRT_STOP_FILTER_VALUE.to_string(),
        },
    }
}
