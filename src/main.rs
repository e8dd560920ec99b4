//! Provides the main entry point to the program.
use std::process::ExitCode;

fn main() -> ExitCode {
    human_panic::setup_panic!();

    if let Err(err) = berlin_drt::cli::run_cli() {
        eprintln!("Error: {err:?}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
