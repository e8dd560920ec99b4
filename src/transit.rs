//! Transit stop facilities of the scheduled public-transit system.
use crate::id::define_id_type;
use crate::input::{parse_attributes, read_vec_from_csv};
use crate::utils::try_insert;
use anyhow::{Context, Result};
use geo::Coord;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

define_id_type!(StopId);

/// A transit stop facility with free-form attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitStopFacility {
    /// The unique identifier of this stop
    pub id: StopId,
    /// Position in the scenario CRS (metres)
    pub coord: Coord<f64>,
    /// Attributes attached to this stop (e.g. `stopFilter`)
    pub attributes: BTreeMap<String, String>,
}

/// The transit schedule, reduced to its stop facilities.
///
/// Departures and transit lines are owned by the host transit router and are not represented
/// here; scenario preparation only reads and annotates stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitSchedule {
    /// All stop facilities, keyed by ID, in file order
    pub stops: IndexMap<StopId, TransitStopFacility>,
}

/// Represents a row of the transit stops CSV file
#[derive(Debug, Deserialize)]
struct StopRow {
    id: String,
    x: f64,
    y: f64,
    /// Flattened attribute list, e.g. `"stopFilter=station_S/U/RE/RB"`
    #[serde(default)]
    attributes: String,
}

impl TransitSchedule {
    /// Read a transit schedule from a stops CSV file.
    pub fn from_csv(stops_file_path: &Path) -> Result<TransitSchedule> {
        let mut schedule = TransitSchedule::default();

        for row in read_vec_from_csv::<StopRow>(stops_file_path)? {
            let stop = TransitStopFacility {
                id: StopId::new(&row.id),
                coord: Coord { x: row.x, y: row.y },
                attributes: parse_attributes(&row.attributes)
                    .with_context(|| format!("Invalid attributes for stop {}", row.id))?,
            };
            try_insert(&mut schedule.stops, stop.id.clone(), stop)
                .with_context(|| format!("Duplicate stop in {}", stops_file_path.display()))?;
        }

        Ok(schedule)
    }
}
