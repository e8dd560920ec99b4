//! Scenario preparation: everything that mutates the scenario before the controller starts.
pub mod network;
pub mod stops;
