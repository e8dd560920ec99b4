//! Tagging of transit stops usable as DRT access/egress anchors.
use crate::service_area::ServiceArea;
use crate::transit::TransitSchedule;
use log::info;

/// Annotate marker-matching transit stops inside the buffered service area.
///
/// Every stop facility carrying `marker_attribute = marker_value` whose coordinate lies within
/// the service area expanded by `buffer` metres additionally gets
/// `new_attribute = new_value`. All other facilities are untouched.
///
/// The buffer exists because stations near the service-area edge may lie slightly outside the
/// polygon. It does not authorise DRT pickup outside the polygon; the passenger walks the last
/// metres between the DRT stop and the station.
///
/// Returns the number of stops tagged.
pub fn tag_transit_stops(
    schedule: &mut TransitSchedule,
    marker_attribute: &str,
    marker_value: &str,
    new_attribute: &str,
    new_value: &str,
    service_area: &ServiceArea,
    buffer: f64,
) -> usize {
    let mut tagged = 0;
    for stop in schedule.stops.values_mut() {
        let matches_marker = stop
            .attributes
            .get(marker_attribute)
            .is_some_and(|value| value == marker_value);
        if matches_marker && service_area.contains_with_buffer(stop.coord, buffer) {
            stop.attributes
                .insert(new_attribute.to_string(), new_value.to_string());
            tagged += 1;
        }
    }
    info!("Tagged {tagged} transit stops as {new_attribute}={new_value}");

    tagged
}
