//! This module defines the typed quantities used throughout the crate.

/// An amount of money in the scenario's monetary units.
///
/// Follows the host convention for monetary events: negative amounts are charges against an
/// agent, positive amounts are payments to the agent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, derive_more::Add, derive_more::Sub)]
pub struct Money(pub f64);

impl Money {
    /// Returns the value as a plain f64.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Money {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).sum())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
