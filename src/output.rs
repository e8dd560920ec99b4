//! The module responsible for writing output data to disk.
use crate::engine::Event;
use crate::population::PersonId;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::path::Path;

/// The output file name for monetary events
const MONEY_EVENTS_FILE_NAME: &str = "money_events.csv";

/// The output file name for the per-iteration main-mode counts
const MAIN_MODES_FILE_NAME: &str = "main_modes.csv";

/// Represents a row in the monetary events CSV file
#[derive(Serialize, Debug, PartialEq)]
struct MoneyEventRow {
    iteration: u32,
    time: f64,
    person: PersonId,
    amount: f64,
    purpose: String,
}

/// Represents a row in the main modes CSV file
#[derive(Serialize, Debug, PartialEq)]
struct MainModeRow {
    iteration: u32,
    main_mode: String,
    trips: usize,
}

/// Writers for the iteration outputs of one run.
pub struct OutputWriters {
    money_events_writer: csv::Writer<File>,
    main_modes_writer: csv::Writer<File>,
}

impl OutputWriters {
    /// Open the output CSV files in the given directory.
    pub fn create(output_path: &Path) -> Result<OutputWriters> {
        fs::create_dir_all(output_path).with_context(|| {
            format!("Failed to create output directory: {}", output_path.display())
        })?;
        let new_writer = |file_name: &str| csv::Writer::from_path(output_path.join(file_name));

        Ok(OutputWriters {
            money_events_writer: new_writer(MONEY_EVENTS_FILE_NAME)?,
            main_modes_writer: new_writer(MAIN_MODES_FILE_NAME)?,
        })
    }

    /// Append the monetary events of one iteration.
    pub fn write_money_events(&mut self, iteration: u32, events: &[Event]) -> Result<()> {
        for event in events {
            let Event::PersonMoney {
                time,
                person,
                amount,
                purpose,
            } = event
            else {
                continue;
            };
            self.money_events_writer.serialize(MoneyEventRow {
                iteration,
                time: *time,
                person: person.clone(),
                amount: amount.0,
                purpose: purpose.clone(),
            })?;
        }
        self.money_events_writer.flush()?;

        Ok(())
    }

    /// Append the main-mode trip counts of one iteration.
    pub fn write_main_modes(
        &mut self,
        iteration: u32,
        counts: &IndexMap<String, usize>,
    ) -> Result<()> {
        for (main_mode, trips) in counts {
            self.main_modes_writer.serialize(MainModeRow {
                iteration,
                main_mode: main_mode.clone(),
                trips: *trips,
            })?;
        }
        self.main_modes_writer.flush()?;

        Ok(())
    }
}
