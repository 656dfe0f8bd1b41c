//! Unit costs used to monetize carbon emissions and installed assets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Key for the carbon price ($/kgCO2).
pub const CARBON: &str = "carbon";
/// Key for the battery capacity price ($/kWh).
pub const BATTERY: &str = "battery";
/// Key for the solar capacity price ($/kWp).
pub const SOLAR: &str = "solar";

/// Per-unit costs for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricingModel {
    /// Carbon price in $/kgCO2.
    pub carbon: f64,
    /// Battery capital cost in $/kWh of installed capacity.
    pub battery: f64,
    /// Solar capital cost in $/kWp of nominal power.
    pub solar: f64,
}

impl PricingModel {
    /// Creates a pricing model, rejecting negative or non-finite prices.
    ///
    /// # Errors
    ///
    /// Returns one `ConfigError` per invalid price.
    pub fn new(carbon: f64, battery: f64, solar: f64) -> Result<Self, Vec<ConfigError>> {
        let pricing = Self {
            carbon,
            battery,
            solar,
        };
        let errors = pricing.validate();
        if errors.is_empty() { Ok(pricing) } else { Err(errors) }
    }

    /// Checks that every price is finite and non-negative.
    ///
    /// Fields are public, so models built by struct literal are checked here
    /// before an evaluation uses them.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (key, value) in [
            (CARBON, self.carbon),
            (BATTERY, self.battery),
            (SOLAR, self.solar),
        ] {
            check_price(key, value, &mut errors);
        }
        errors
    }

    /// Builds a pricing model from a key/value map holding exactly the
    /// `carbon`, `battery` and `solar` keys.
    ///
    /// # Errors
    ///
    /// Returns errors for missing keys, unknown keys and invalid prices.
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut get = |key: &str| match map.get(key) {
            Some(v) => *v,
            None => {
                errors.push(ConfigError::new(
                    format!("pricing.{key}"),
                    "required key is missing",
                ));
                0.0
            }
        };
        let carbon = get(CARBON);
        let battery = get(BATTERY);
        let solar = get(SOLAR);

        let mut unknown: Vec<&String> = map
            .keys()
            .filter(|k| ![CARBON, BATTERY, SOLAR].contains(&k.as_str()))
            .collect();
        unknown.sort();
        for key in unknown {
            errors.push(ConfigError::new(
                format!("pricing.{key}"),
                "unknown key, expected one of carbon, battery, solar",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Self::new(carbon, battery, solar)
    }
}

/// Pricing section as written in a TOML config.
///
/// Capital prices may be omitted when capital costs are not evaluated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub carbon: Option<f64>,
    pub battery: Option<f64>,
    pub solar: Option<f64>,
}

impl PricingConfig {
    /// Resolves the prices needed for an evaluation.
    ///
    /// `carbon` is always required since the carbon term is always computed.
    /// `battery` and `solar` are required only when `design` is set; otherwise
    /// missing values resolve to zero.
    ///
    /// # Errors
    ///
    /// Returns every missing or invalid price.
    pub fn resolve(&self, design: bool) -> Result<PricingModel, Vec<ConfigError>> {
        let mut errors = Vec::new();
        let mut required = |key: &str, value: Option<f64>, needed: bool| match value {
            Some(v) => v,
            None => {
                if needed {
                    errors.push(ConfigError::new(
                        format!("pricing.{key}"),
                        if key == CARBON {
                            "required key is missing".to_string()
                        } else {
                            "required when evaluation.design = true".to_string()
                        },
                    ));
                }
                0.0
            }
        };
        let carbon = required(CARBON, self.carbon, true);
        let battery = required(BATTERY, self.battery, design);
        let solar = required(SOLAR, self.solar, design);
        if !errors.is_empty() {
            return Err(errors);
        }
        PricingModel::new(carbon, battery, solar)
    }
}

fn check_price(key: &str, value: f64, errors: &mut Vec<ConfigError>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigError::new(
            format!("pricing.{key}"),
            format!("must be a finite value >= 0, got {value}"),
        ));
    }
}
