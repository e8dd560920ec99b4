//! DRT vehicle fleets.
use crate::id::define_id_type;
use crate::input::read_vec_from_csv;
use crate::network::LinkId;
use crate::utils::try_insert;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

define_id_type!(VehicleId);

/// A single DRT vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct DrtVehicle {
    /// The unique identifier of this vehicle
    pub id: VehicleId,
    /// The link the vehicle starts its service day on
    pub start_link: LinkId,
    /// Time of day (seconds) the vehicle enters service
    pub service_begin: f64,
    /// Time of day (seconds) the vehicle leaves service
    pub service_end: f64,
}

/// The vehicle fleet of one DRT mode.
///
/// The passenger capacity is uniform across the fleet (a capacity of 1 means there is no
/// ride-sharing).
#[derive(Debug, Clone, PartialEq)]
pub struct DrtFleet {
    /// The DRT mode served by this fleet
    pub mode: String,
    /// Passenger capacity of each vehicle
    pub capacity: u32,
    /// All vehicles, keyed by ID
    pub vehicles: IndexMap<VehicleId, DrtVehicle>,
}

/// Represents a row of a DRT vehicles CSV file
#[derive(Debug, Deserialize)]
struct VehicleRow {
    id: String,
    start_link: String,
    service_begin: f64,
    service_end: f64,
}

impl DrtFleet {
    /// Read the fleet of a DRT mode from a vehicles CSV file.
    pub fn from_csv(vehicles_file_path: &Path, mode: &str, capacity: u32) -> Result<DrtFleet> {
        ensure!(
            capacity >= 1,
            "Vehicle capacity for mode {mode} must be at least 1"
        );

        let mut fleet = DrtFleet {
            mode: mode.to_string(),
            capacity,
            vehicles: IndexMap::new(),
        };
        for row in read_vec_from_csv::<VehicleRow>(vehicles_file_path)? {
            ensure!(
                row.service_begin < row.service_end,
                "Vehicle {} has an empty service window",
                row.id
            );
            let vehicle = DrtVehicle {
                id: VehicleId::new(&row.id),
                start_link: LinkId::new(&row.start_link),
                service_begin: row.service_begin,
                service_end: row.service_end,
            };
            try_insert(&mut fleet.vehicles, vehicle.id.clone(), vehicle).with_context(|| {
                format!("Duplicate vehicle in {}", vehicles_file_path.display())
            })?;
        }

        Ok(fleet)
    }
}
