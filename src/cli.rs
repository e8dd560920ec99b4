//! The command line interface and assembly of the simulation.
use crate::config::Config;
use crate::engine::{Controler, EventsManager};
use crate::fare::{DrtFareCompensator, compensation_from_fares};
use crate::log;
use crate::router::IntermodalMainModeIdentifier;
use crate::scenario::Scenario;
use ::log::info;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// The configuration used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str =
    "scenarios/berlin-v5.5-1pct/input/drt/berlin-drt-v5.5-1pct.config.toml";

/// The command line interface for the scenario runner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the simulation configuration file
    config: Option<PathBuf>,
    /// Directory for output files (overrides the configuration)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Parse CLI arguments and start the run.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ berlin-drt --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    handle_run_command(&config_path, cli.output_dir.as_deref())
}

/// Load, prepare and run the scenario named by the configuration file.
pub fn handle_run_command(config_path: &Path, output_dir: Option<&Path>) -> Result<()> {
    let config = Config::from_path(config_path).context("Failed to load config.")?;

    // The command-line argument overrides the configured output directory
    let output_path = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.controler.output_directory.clone());
    fs::create_dir_all(&output_path).with_context(|| {
        format!("Failed to create output directory: {}", output_path.display())
    })?;

    // Initialise program logger
    log::init(config.controler.log_level.as_deref(), Some(&output_path))
        .context("Failed to initialise logging.")?;
    info!("Loaded config from {}", config_path.display());
    info!("Output folder: {}", output_path.display());

    let mut scenario = Scenario::from_config(config).context("Failed to load scenario.")?;
    scenario.prepare().context("Failed to prepare scenario.")?;

    let controler = prepare_controler(scenario, &output_path);
    controler.run()?;
    info!("Simulation complete!");

    Ok(())
}

/// Assemble the controller: event handlers and the intermodal main-mode identifier.
///
/// The fare compensator is parameterised with the per-mode compensation derived from the DRT
/// fares group, covering each mode's teleported variant as well.
pub fn prepare_controler(scenario: Scenario, output_path: &Path) -> Controler {
    let compensation_by_mode = compensation_from_fares(&scenario.config.drt_fares);
    let pt_modes: Vec<String> = scenario.config.pt_intermodal.pt_modes.clone();

    let mut events = EventsManager::new();
    events.add_handler(Box::new(DrtFareCompensator::new(
        compensation_by_mode,
        pt_modes.iter().cloned().collect(),
    )));

    let main_mode_identifier = IntermodalMainModeIdentifier::new(
        scenario
            .config
            .drt
            .modes
            .iter()
            .map(|drt_mode| drt_mode.mode.clone()),
        pt_modes,
    );

    Controler::new(
        scenario,
        events,
        main_mode_identifier,
        output_path.to_path_buf(),
    )
}
