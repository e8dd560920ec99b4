//! Integration tests for scenario loading and preparation.
use berlin_drt::config::Config;
use berlin_drt::population::Route;
use berlin_drt::scenario::{DRT_STOP_FILTER_ATTRIBUTE, DRT_STOP_FILTER_VALUE, Scenario};
use tempfile::tempdir;

mod common;

/// Loading and preparing the miniature scenario augments the network and tags the station.
#[test]
fn test_scenario_from_config_and_prepare() {
    let model_dir = tempdir().unwrap();
    let config_path = common::write_model(model_dir.path());

    let config = Config::from_path(&config_path).unwrap();
    let mut scenario = Scenario::from_config(config).unwrap();
    scenario.prepare().unwrap();

    // Both road links are inside the service area and carry the DRT mode afterwards
    for link in scenario.network.links.values() {
        assert!(
            link.allowed_modes.contains("drt"),
            "link {} should carry drt",
            link.id
        );
    }

    // The station 50 m outside the polygon is tagged through the 200 m buffer; the one far
    // away is not
    let tagged = &scenario.transit_schedule.stops["s1"];
    assert_eq!(
        tagged.attributes.get(DRT_STOP_FILTER_ATTRIBUTE).unwrap(),
        DRT_STOP_FILTER_VALUE
    );
    let untagged = &scenario.transit_schedule.stops["s2"];
    assert!(!untagged.attributes.contains_key(DRT_STOP_FILTER_ATTRIBUTE));

    // The DRT leg's route was created by the DRT route factory
    let person = &scenario.population.persons["p1"];
    let drt_route = person
        .plan
        .elements
        .iter()
        .find_map(|element| match element {
            berlin_drt::population::PlanElement::Leg(leg) if leg.mode == "drt" => {
                Some(&leg.route)
            }
            _ => None,
        })
        .unwrap();
    let Route::Drt(drt_route) = drt_route else {
        panic!("expected a typed DRT route, got {drt_route:?}");
    };
    assert_eq!(drt_route.direct_ride_time, 420.0);
    assert_eq!(drt_route.max_wait_time, 600.0);
}
