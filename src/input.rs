//! Common routines for handling input data.
use anyhow::{Context, Result, ensure};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Read a TOML file from the specified path.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read file {}", file_path.display()))?;
    let toml_data = toml::from_str(&toml_str)
        .with_context(|| format!("Could not parse TOML file {}", file_path.display()))?;

    Ok(toml_data)
}

/// Read a series of type `T`s from a CSV file into a `Vec<T>`.
///
/// # Arguments
///
/// * `file_path`: Path to the CSV file
pub fn read_vec_from_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not open file {}", file_path.display()))?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let record: T = result
            .with_context(|| format!("Error reading record from {}", file_path.display()))?;
        vec.push(record);
    }
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec)
}

/// Parse a flattened attribute list of the form `key1=value1;key2=value2`.
///
/// An empty input yields an empty map. Keys must be unique and non-empty; values may contain
/// `=` characters.
pub fn parse_attributes(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for entry in raw.split(';').filter(|entry| !entry.is_empty()) {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Attribute entry '{entry}' is not of the form key=value"))?;
        ensure!(!key.is_empty(), "Attribute entry '{entry}' has an empty key");
        ensure!(
            attributes.insert(key.to_string(), value.to_string()).is_none(),
            "Duplicate attribute key '{key}'"
        );
    }

    Ok(attributes)
}
