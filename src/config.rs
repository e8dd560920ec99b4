//! Code for loading the scenario configuration.
//!
//! The configuration is one TOML file composed of groups. The groups required for a DRT run
//! (`drt`, `dvrp`, `drt_fares`, `pt_intermodal`, `raptor`) must all be present; value
//! constraints are checked after parsing so a broken configuration aborts setup naming the
//! offending field.
use crate::input::read_toml;
use crate::network::modes;
use crate::scenario::{DRT_STOP_FILTER_ATTRIBUTE, DRT_STOP_FILTER_VALUE, ROUTING_MODE_PT_WITH_DRT};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The full scenario configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// The simulation controller group
    pub controler: ControlerConfig,
    /// The road network group
    pub network: NetworkConfig,
    /// The population group
    pub plans: PlansConfig,
    /// The transit schedule group
    pub transit: TransitConfig,
    /// The multi-mode DRT group
    pub drt: MultiModeDrtConfig,
    /// The dynamic vehicle routing platform group
    pub dvrp: DvrpConfig,
    /// The DRT fares group
    pub drt_fares: DrtFaresConfig,
    /// The intermodal pt routing modes group
    pub pt_intermodal: PtIntermodalRoutingModesConfig,
    /// The raptor transit router group
    pub raptor: RaptorConfig,
}

/// Settings of the simulation controller.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ControlerConfig {
    /// Directory for iteration outputs
    pub output_directory: PathBuf,
    /// Number of iterations to run
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// The program log level, unless overridden by the environment
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_iterations() -> u32 {
    1
}

/// Input files of the road network.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Path to the nodes CSV file
    pub nodes_file: PathBuf,
    /// Path to the links CSV file
    pub links_file: PathBuf,
}

/// Input files of the population.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlansConfig {
    /// Path to the persons CSV file
    pub persons_file: PathBuf,
    /// Path to the plans CSV file
    pub plans_file: PathBuf,
}

/// Input files of the transit schedule.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransitConfig {
    /// Path to the transit stops CSV file
    pub stops_file: PathBuf,
}

/// The multi-mode DRT group: one sub-group per DRT mode.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MultiModeDrtConfig {
    /// The configured DRT modes
    pub modes: Vec<DrtModeConfig>,
}

/// Configuration of a single DRT mode.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DrtModeConfig {
    /// The mode name, distinct from all built-in modes
    pub mode: String,
    /// Polygon shapefile defining where this mode is offered; without it the network is not
    /// augmented and no stops are tagged for this mode
    #[serde(default)]
    pub service_area_shapefile: Option<PathBuf>,
    /// Path to the vehicles CSV file of this mode's fleet
    pub vehicles_file: PathBuf,
    /// Passenger capacity of each vehicle (1 means no ride-sharing)
    pub vehicle_capacity: u32,
    /// Time a vehicle spends at each stop for boarding/alighting, in seconds
    #[serde(default = "default_stop_duration")]
    pub stop_duration: f64,
}

fn default_stop_duration() -> f64 {
    60.0
}

/// The dynamic vehicle routing platform group.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DvrpConfig {
    /// The network mode whose links DVRP vehicles are routed on
    #[serde(default = "default_dvrp_network_mode")]
    pub network_mode: String,
    /// Exponential smoothing factor for the travel time estimates fed back between iterations
    #[serde(default = "default_travel_time_estimation_alpha")]
    pub travel_time_estimation_alpha: f64,
}

fn default_dvrp_network_mode() -> String {
    modes::CAR.to_string()
}

fn default_travel_time_estimation_alpha() -> f64 {
    0.05
}

/// The DRT fares group: one sub-group per DRT mode.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DrtFaresConfig {
    /// The per-mode fare parameters
    pub fares: Vec<DrtFareConfig>,
}

/// Fare parameters of a single DRT mode, in monetary units.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DrtFareConfig {
    /// The DRT mode these fares apply to
    pub mode: String,
    /// Fixed fare per trip
    pub base_fare: f64,
    /// Floor fare per trip
    pub min_fare_per_trip: f64,
    /// Fare per metre travelled
    pub distance_fare_per_m: f64,
    /// Fare per hour travelled
    #[serde(default)]
    pub time_fare_per_h: f64,
}

/// The intermodal pt routing modes group.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PtIntermodalRoutingModesConfig {
    /// The routing modes combining pt with DRT access/egress, e.g. `pt_w_drt`
    pub routing_modes: Vec<String>,
    /// The modes counting as public transit when classifying trips
    #[serde(default = "default_pt_modes")]
    pub pt_modes: Vec<String>,
}

fn default_pt_modes() -> Vec<String> {
    vec![modes::PT.to_string()]
}

/// The raptor transit router group.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RaptorConfig {
    /// Whether the router may use DRT for transit access and egress
    #[serde(default = "default_true")]
    pub use_intermodal_access_egress: bool,
    /// The stop attribute enumerating DRT access/egress candidates
    #[serde(default = "default_stop_filter_attribute")]
    pub stop_filter_attribute: String,
    /// The value the stop attribute must have
    #[serde(default = "default_stop_filter_value")]
    pub stop_filter_value: String,
}

fn default_true() -> bool {
    true
}

fn default_stop_filter_attribute() -> String {
    DRT_STOP_FILTER_ATTRIBUTE.to_string()
}

fn default_stop_filter_value() -> String {
    DRT_STOP_FILTER_VALUE.to_string()
}

impl Config {
    /// Read and validate a configuration from the specified TOML file.
    ///
    /// Relative input paths are resolved against the config file's directory. The output
    /// directory stays as given, relative to the invocation directory.
    pub fn from_path(file_path: &Path) -> Result<Config> {
        let mut config: Config = read_toml(file_path)?;
        let base_dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_input_paths(base_dir);
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", file_path.display()))?;

        Ok(config)
    }

    /// Resolve relative input paths against the config file's directory.
    fn resolve_input_paths(&mut self, base_dir: &Path) {
        resolve(base_dir, &mut self.network.nodes_file);
        resolve(base_dir, &mut self.network.links_file);
        resolve(base_dir, &mut self.plans.persons_file);
        resolve(base_dir, &mut self.plans.plans_file);
        resolve(base_dir, &mut self.transit.stops_file);
        for drt_mode in &mut self.drt.modes {
            resolve(base_dir, &mut drt_mode.vehicles_file);
            if let Some(shapefile) = &mut drt_mode.service_area_shapefile {
                resolve(base_dir, shapefile);
            }
        }
    }

    /// Check all value constraints across groups.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.controler.iterations >= 1,
            "controler.iterations must be at least 1"
        );
        check_drt_modes(&self.drt)?;
        check_fares(&self.drt_fares)?;
        check_fares_cover_drt_modes(&self.drt, &self.drt_fares)?;
        check_pt_intermodal(&self.pt_intermodal)?;
        ensure!(
            (0.0..=1.0).contains(&self.dvrp.travel_time_estimation_alpha)
                && self.dvrp.travel_time_estimation_alpha > 0.0,
            "dvrp.travel_time_estimation_alpha must be in (0, 1]"
        );
        ensure!(
            !self.raptor.stop_filter_attribute.is_empty(),
            "raptor.stop_filter_attribute must not be empty"
        );

        Ok(())
    }
}

/// Prefix a relative path with the given base directory.
fn resolve(base_dir: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        let joined = base_dir.join(&*path);
        *path = joined;
    }
}

/// Check the multi-mode DRT group: mode names unique and distinct from built-ins.
fn check_drt_modes(drt: &MultiModeDrtConfig) -> Result<()> {
    ensure!(
        !drt.modes.is_empty(),
        "The drt group must configure at least one mode"
    );

    let mut seen = HashSet::new();
    for drt_mode in &drt.modes {
        let builtin = [modes::CAR, modes::PT, modes::WALK, modes::BIKE];
        ensure!(
            !builtin.contains(&drt_mode.mode.as_str()),
            "DRT mode name {} collides with a built-in mode",
            drt_mode.mode
        );
        ensure!(
            seen.insert(drt_mode.mode.as_str()),
            "Duplicate DRT mode {}",
            drt_mode.mode
        );
        ensure!(
            drt_mode.vehicle_capacity >= 1,
            "drt.modes.vehicle_capacity of mode {} must be at least 1",
            drt_mode.mode
        );
        ensure!(
            drt_mode.stop_duration >= 0.0,
            "drt.modes.stop_duration of mode {} must be non-negative",
            drt_mode.mode
        );
    }

    Ok(())
}

/// Check the fare parameters: all values finite and non-negative.
fn check_fares(drt_fares: &DrtFaresConfig) -> Result<()> {
    for fare in &drt_fares.fares {
        for (field, value) in [
            ("base_fare", fare.base_fare),
            ("min_fare_per_trip", fare.min_fare_per_trip),
            ("distance_fare_per_m", fare.distance_fare_per_m),
            ("time_fare_per_h", fare.time_fare_per_h),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "drt_fares.{field} of mode {} must be a non-negative number",
                fare.mode
            );
        }
    }

    Ok(())
}

/// Check that every configured DRT mode has a fare entry.
///
/// This is the cross-group adjustment of the multi-mode DRT config: fares are read per mode at
/// assembly time, so a missing entry must fail here rather than during the run. Fare entries
/// for unconfigured modes are tolerated with a warning.
fn check_fares_cover_drt_modes(drt: &MultiModeDrtConfig, drt_fares: &DrtFaresConfig) -> Result<()> {
    let fare_modes: HashSet<&str> = drt_fares
        .fares
        .iter()
        .map(|fare| fare.mode.as_str())
        .collect();
    for drt_mode in &drt.modes {
        ensure!(
            fare_modes.contains(drt_mode.mode.as_str()),
            "DRT mode {} has no entry in the drt_fares group",
            drt_mode.mode
        );
    }

    let drt_modes: HashSet<&str> = drt.modes.iter().map(|m| m.mode.as_str()).collect();
    for fare in &drt_fares.fares {
        if !drt_modes.contains(fare.mode.as_str()) {
            warn!(
                "drt_fares configures mode {} which is not a configured DRT mode",
                fare.mode
            );
        }
    }

    Ok(())
}

/// Check the intermodal routing modes group.
fn check_pt_intermodal(pt_intermodal: &PtIntermodalRoutingModesConfig) -> Result<()> {
    ensure!(
        !pt_intermodal.routing_modes.is_empty(),
        "pt_intermodal.routing_modes must not be empty"
    );
    ensure!(
        !pt_intermodal.pt_modes.is_empty(),
        "pt_intermodal.pt_modes must not be empty"
    );
    if !pt_intermodal
        .routing_modes
        .iter()
        .any(|mode| mode == ROUTING_MODE_PT_WITH_DRT)
    {
        warn!(
            "pt_intermodal.routing_modes does not contain {ROUTING_MODE_PT_WITH_DRT}; \
             intermodal DRT routing will not be offered"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// A minimal, valid configuration file.
    fn minimal_config_toml() -> String {
        r#"
            [controler]
            output_directory = "output"
            iterations = 2

            [network]
            nodes_file = "nodes.csv"
            links_file = "links.csv"

            [plans]
            persons_file = "persons.csv"
            plans_file = "plans.csv"

            [transit]
            stops_file = "transit_stops.csv"

            [drt]
            [[drt.modes]]
            mode = "drt"
            service_area_shapefile = "service_area.shp"
            vehicles_file = "vehicles_drt.csv"
            vehicle_capacity = 4

            [dvrp]

            [drt_fares]
            [[drt_fares.fares]]
            mode = "drt"
            base_fare = 1.0
            min_fare_per_trip = 4.0
            distance_fare_per_m = 0.002

            [pt_intermodal]
            routing_modes = ["pt_w_drt"]

            [raptor]
        "#
        .to_string()
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.toml");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "{contents}").unwrap();
        (dir, file_path)
    }

    #[test]
    fn test_config_from_path() {
        let (dir, file_path) = write_config(&minimal_config_toml());

        let config = Config::from_path(&file_path).unwrap();
        assert_eq!(config.controler.iterations, 2);
        assert_eq!(config.drt.modes.len(), 1);
        // input paths are resolved against the config directory
        assert_eq!(config.network.nodes_file, dir.path().join("nodes.csv"));
        assert_eq!(
            config.drt.modes[0].service_area_shapefile,
            Some(dir.path().join("service_area.shp"))
        );
        // defaults
        assert_eq!(config.dvrp.network_mode, "car");
        assert_eq!(config.pt_intermodal.pt_modes, vec!["pt".to_string()]);
        assert_eq!(config.raptor.stop_filter_attribute, "drtStopFilter");
    }

    #[test]
    fn test_config_missing_required_group() {
        let toml = minimal_config_toml().replace("[dvrp]", "");
        let (_dir, file_path) = write_config(&toml);

        let err = Config::from_path(&file_path).unwrap_err();
        assert!(err.root_cause().to_string().contains("dvrp"));
    }

    #[test]
    fn test_config_duplicate_drt_mode() {
        let toml = minimal_config_toml().replace(
            "[dvrp]",
            r#"
            [[drt.modes]]
            mode = "drt"
            vehicles_file = "vehicles_drt.csv"
            vehicle_capacity = 1

            [dvrp]
            "#,
        );
        let (_dir, file_path) = write_config(&toml);

        let err = Config::from_path(&file_path).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Duplicate DRT mode drt");
    }

    #[test]
    fn test_config_drt_mode_without_fare() {
        let toml = minimal_config_toml().replace("mode = \"drt\"\n            base_fare", "mode = \"other\"\n            base_fare");
        let (_dir, file_path) = write_config(&toml);

        let err = Config::from_path(&file_path).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "DRT mode drt has no entry in the drt_fares group"
        );
    }

    #[test]
    fn test_config_negative_fare() {
        let toml = minimal_config_toml().replace("min_fare_per_trip = 4.0", "min_fare_per_trip = -4.0");
        let (_dir, file_path) = write_config(&toml);

        let err = Config::from_path(&file_path).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "drt_fares.min_fare_per_trip of mode drt must be a non-negative number"
        );
    }

    #[test]
    fn test_config_builtin_mode_name() {
        let toml = minimal_config_toml().replacen("mode = \"drt\"", "mode = \"car\"", 1);
        let (_dir, file_path) = write_config(&toml);

        let err = Config::from_path(&file_path).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "DRT mode name car collides with a built-in mode"
        );
    }
}
