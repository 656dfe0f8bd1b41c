//! Post-simulation reduction of building energy series into a lifecycle cost.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{ConfigError, EvalError};
use crate::pricing::PricingModel;

/// Level at which negative net consumption (export) is zeroed before pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClipLevel {
    /// Sum buildings first, then clip the district series.
    District,
    /// Clip each building's series, then sum the priced results.
    Building,
    /// Building-level for electricity, district-level for carbon.
    #[default]
    Mixed,
}

impl ClipLevel {
    pub fn code(self) -> char {
        match self {
            ClipLevel::District => 'd',
            ClipLevel::Building => 'b',
            ClipLevel::Mixed => 'm',
        }
    }

    fn electricity_per_building(self) -> bool {
        matches!(self, ClipLevel::Building | ClipLevel::Mixed)
    }

    fn carbon_per_building(self) -> bool {
        matches!(self, ClipLevel::Building)
    }
}

impl FromStr for ClipLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "d" | "district" => Ok(ClipLevel::District),
            "b" | "building" => Ok(ClipLevel::Building),
            "m" | "mixed" => Ok(ClipLevel::Mixed),
            other => Err(ConfigError::new(
                "evaluation.clip_level",
                format!("must be \"d\", \"b\" or \"m\", got \"{other}\""),
            )),
        }
    }
}

impl TryFrom<String> for ClipLevel {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ClipLevel> for String {
    fn from(level: ClipLevel) -> Self {
        level.code().to_string()
    }
}

impl fmt::Display for ClipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What a contribution to the objective pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Electricity,
    Carbon,
    BatteryCapex,
    SolarCapex,
}

impl ContributionKind {
    pub fn label(self) -> &'static str {
        match self {
            ContributionKind::Electricity => "electricity",
            ContributionKind::Carbon => "carbon",
            ContributionKind::BatteryCapex => "battery_capex",
            ContributionKind::SolarCapex => "solar_capex",
        }
    }
}

/// A named cost term in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectiveContribution {
    pub kind: ContributionKind,
    pub value: f64,
}

/// Scalar objective and the ordered terms it is summed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub objective: f64,
    pub objective_contrs: Vec<ObjectiveContribution>,
}

impl EvaluationResult {
    fn from_contributions(objective_contrs: Vec<ObjectiveContribution>) -> Self {
        Self {
            objective: objective_contrs.iter().map(|c| c.value).sum(),
            objective_contrs,
        }
    }

    /// Value of the first contribution of `kind`, if present.
    pub fn contribution(&self, kind: ContributionKind) -> Option<f64> {
        self.objective_contrs
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value)
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Design Evaluation ---")?;
        for c in &self.objective_contrs {
            writeln!(f, "{:<15} {:>16.2} $", c.kind.label(), c.value)?;
        }
        write!(f, "{:<15} {:>16.2} $", "objective", self.objective)
    }
}

/// Snapshot of the terminal environment's energy series and asset sizes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistrictSeries {
    /// Net electricity consumption per building per step (kWh).
    pub net_consumption: Vec<Vec<f64>>,
    /// Electricity price per step ($/kWh).
    pub electricity_pricing: Vec<f64>,
    /// Carbon intensity per step (kgCO2/kWh).
    pub carbon_intensity: Vec<f64>,
    /// Installed battery capacity per building (kWh).
    pub battery_capacities: Vec<f64>,
    /// Nominal solar power per building (kWp).
    pub solar_capacities: Vec<f64>,
}

impl DistrictSeries {
    /// Reads the accumulated series out of a finished environment.
    ///
    /// Installed battery capacity is the earliest entry of each building's
    /// capacity history, since the environment may have adjusted the design.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Series` if a capacity history is empty.
    pub fn from_env<E: Environment + ?Sized>(env: &E) -> Result<Self, EvalError> {
        let n = env.building_count();
        let battery_capacities = (0..n)
            .map(|b| {
                env.capacity_history(b).first().copied().ok_or_else(|| {
                    EvalError::Series(format!("empty capacity history for building {b}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            net_consumption: (0..n)
                .map(|b| env.net_electricity_consumption(b).to_vec())
                .collect(),
            electricity_pricing: env.electricity_pricing().to_vec(),
            carbon_intensity: env.carbon_intensity().to_vec(),
            battery_capacities,
            solar_capacities: (0..n).map(|b| env.nominal_solar_power(b)).collect(),
        })
    }

    fn check(&self) -> Result<(), EvalError> {
        let n = self.net_consumption.len();
        if n == 0 {
            return Err(EvalError::Series("no buildings".into()));
        }
        if self.battery_capacities.len() != n || self.solar_capacities.len() != n {
            return Err(EvalError::Series(format!(
                "{n} consumption series but {} battery and {} solar capacities",
                self.battery_capacities.len(),
                self.solar_capacities.len()
            )));
        }
        let len = self.electricity_pricing.len();
        if self.carbon_intensity.len() != len {
            return Err(EvalError::Series(format!(
                "{len} price steps but {} carbon intensity steps",
                self.carbon_intensity.len()
            )));
        }
        if let Some(b) = self.net_consumption.iter().position(|s| s.len() != len) {
            return Err(EvalError::Series(format!(
                "building {b} has {} consumption steps, expected {len}",
                self.net_consumption[b].len()
            )));
        }
        Ok(())
    }

    /// District net consumption per step, clipped at zero.
    fn district_clipped(&self) -> Vec<f64> {
        (0..self.electricity_pricing.len())
            .map(|t| {
                self.net_consumption
                    .iter()
                    .map(|s| s[t])
                    .sum::<f64>()
                    .max(0.0)
            })
            .collect()
    }

    /// Sum-then-clip priced against `prices`.
    fn district_cost(&self, prices: &[f64]) -> f64 {
        dot(&self.district_clipped(), prices)
    }

    /// Clip-then-sum priced against `prices`.
    fn building_cost(&self, prices: &[f64]) -> f64 {
        self.net_consumption
            .iter()
            .map(|s| {
                s.iter()
                    .zip(prices)
                    .map(|(e, p)| e.max(0.0) * p)
                    .sum::<f64>()
            })
            .sum()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Reduces a finished episode to the objective and its breakdown.
///
/// Operating terms (electricity, carbon) are clipped per `clip_level`. With
/// `design` set they are scaled by `opex_factor` and followed by the unscaled
/// battery and solar capital costs.
///
/// # Errors
///
/// Returns `EvalError::Series` if the series are empty or misaligned.
pub fn aggregate(
    series: &DistrictSeries,
    pricing: &PricingModel,
    opex_factor: f64,
    clip_level: ClipLevel,
    design: bool,
) -> Result<EvaluationResult, EvalError> {
    series.check()?;

    let electricity = if clip_level.electricity_per_building() {
        series.building_cost(&series.electricity_pricing)
    } else {
        series.district_cost(&series.electricity_pricing)
    };
    let carbon = if clip_level.carbon_per_building() {
        series.building_cost(&series.carbon_intensity)
    } else {
        series.district_cost(&series.carbon_intensity)
    } * pricing.carbon;

    let mut contrs = vec![
        ObjectiveContribution {
            kind: ContributionKind::Electricity,
            value: electricity,
        },
        ObjectiveContribution {
            kind: ContributionKind::Carbon,
            value: carbon,
        },
    ];

    if design {
        for c in &mut contrs {
            c.value *= opex_factor;
        }
        contrs.push(ObjectiveContribution {
            kind: ContributionKind::BatteryCapex,
            value: series.battery_capacities.iter().sum::<f64>() * pricing.battery,
        });
        contrs.push(ObjectiveContribution {
            kind: ContributionKind::SolarCapex,
            value: series.solar_capacities.iter().sum::<f64>() * pricing.solar,
        });
    }

    Ok(EvaluationResult::from_contributions(contrs))
}
