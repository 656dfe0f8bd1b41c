//! Candidate hardware sizing for a district of buildings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-building hardware sizing proposed by an outer design search.
///
/// All three sequences are aligned by building index and must have the same
/// length, which fixes the number of buildings `N` for the evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesignParameters {
    /// Battery energy capacity per building (kWh).
    pub battery_capacities: Vec<f64>,
    /// Battery round-trip efficiency per building (fraction in (0, 1]).
    pub battery_efficiencies: Vec<f64>,
    /// Solar nominal power per building (kWp).
    pub solar_capacities: Vec<f64>,
}

impl DesignParameters {
    pub fn new(
        battery_capacities: Vec<f64>,
        battery_efficiencies: Vec<f64>,
        solar_capacities: Vec<f64>,
    ) -> Self {
        Self {
            battery_capacities,
            battery_efficiencies,
            solar_capacities,
        }
    }

    /// Number of buildings described by the design.
    pub fn building_count(&self) -> usize {
        self.battery_capacities.len()
    }

    /// Validates shape and ranges, returning every violation found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let n = self.battery_capacities.len();

        if n == 0 {
            errors.push(ConfigError::new(
                "design.battery_capacities",
                "must describe at least one building",
            ));
        }
        if self.battery_efficiencies.len() != n {
            errors.push(ConfigError::new(
                "design.battery_efficiencies",
                format!(
                    "has {} entries, expected {n} (one per building)",
                    self.battery_efficiencies.len()
                ),
            ));
        }
        if self.solar_capacities.len() != n {
            errors.push(ConfigError::new(
                "design.solar_capacities",
                format!(
                    "has {} entries, expected {n} (one per building)",
                    self.solar_capacities.len()
                ),
            ));
        }

        for (i, c) in self.battery_capacities.iter().enumerate() {
            if !c.is_finite() || *c < 0.0 {
                errors.push(ConfigError::new(
                    format!("design.battery_capacities[{i}]"),
                    format!("must be a finite value >= 0, got {c}"),
                ));
            }
        }
        for (i, eta) in self.battery_efficiencies.iter().enumerate() {
            if !(*eta > 0.0 && *eta <= 1.0) {
                errors.push(ConfigError::new(
                    format!("design.battery_efficiencies[{i}]"),
                    format!("must be in (0.0, 1.0], got {eta}"),
                ));
            }
        }
        for (i, p) in self.solar_capacities.iter().enumerate() {
            if !p.is_finite() || *p < 0.0 {
                errors.push(ConfigError::new(
                    format!("design.solar_capacities[{i}]"),
                    format!("must be a finite value >= 0, got {p}"),
                ));
            }
        }

        errors
    }
}
