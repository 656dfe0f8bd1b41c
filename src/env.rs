//! Contracts for the stepping environment driven by the control loop.
//!
//! The environment owns the building physics. The control loop only steps it
//! with [`ActionVector`]s and reads [`Observations`] back; the objective reads
//! the accumulated energy series once the episode is over.

use std::ops::Range;

use crate::error::EnvError;

/// Latest observation matrix: one row per building, columns follow the
/// layout declared by [`Environment::observation_names`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observations {
    rows: Vec<Vec<f64>>,
}

impl Observations {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Number of buildings (rows).
    pub fn building_count(&self) -> usize {
        self.rows.len()
    }

    /// Column `index` across all buildings; `None` if any row is too short.
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.get(index).copied()).collect()
    }
}

/// Per-building control signals for one step.
///
/// Each entry is a charge (positive) or discharge (negative) amount expressed
/// as a fraction of that building's battery capacity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionVector(pub Vec<f64>);

impl ActionVector {
    /// No battery activity in any of `n` buildings.
    pub fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|a| *a == 0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Result of advancing the environment by one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub observations: Observations,
    /// Reward reported by the environment; not used by the evaluation.
    pub reward: f64,
    pub done: bool,
}

/// A stepping building-district simulation.
pub trait Environment {
    /// Number of buildings `N`.
    fn building_count(&self) -> usize;

    /// Total number of steps in one episode.
    fn time_steps(&self) -> usize;

    /// Names of the per-building observation columns, in column order.
    fn observation_names(&self) -> &[&'static str];

    /// Resets the episode and returns the initial observations.
    fn reset(&mut self) -> Result<Observations, EnvError>;

    /// Applies `actions` and advances by one step.
    fn step(&mut self, actions: &ActionVector) -> Result<StepOutcome, EnvError>;

    /// Net electricity consumption of building `b` for every elapsed step (kWh).
    fn net_electricity_consumption(&self, b: usize) -> &[f64];

    /// Electricity price for every elapsed step ($/kWh), shared by all buildings.
    fn electricity_pricing(&self) -> &[f64];

    /// Grid carbon intensity for every elapsed step (kgCO2/kWh), shared by all buildings.
    fn carbon_intensity(&self) -> &[f64];

    /// Battery capacity of building `b` as recorded over the episode (kWh).
    ///
    /// The first entry is the installed capacity after the environment's own
    /// validation of the requested design.
    fn capacity_history(&self, b: usize) -> &[f64];

    /// Nominal solar power of building `b` (kWp).
    fn nominal_solar_power(&self, b: usize) -> f64;
}

/// Ground-truth data a planner may read for a forecast window.
pub trait ForecastSource {
    /// Non-shiftable load of building `b` over `steps` (kWh per step).
    fn load_forecast(&self, b: usize, steps: Range<usize>) -> Vec<f64>;

    /// Solar generation of building `b` over `steps` (kWh per step).
    fn solar_forecast(&self, b: usize, steps: Range<usize>) -> Vec<f64>;

    /// Battery round-trip efficiency of building `b`.
    fn battery_efficiency(&self, b: usize) -> f64;

    /// Battery capacity of building `b` (kWh).
    fn battery_capacity(&self, b: usize) -> f64;

    /// Largest energy the battery of building `b` may move in one step (kWh).
    fn battery_step_limit(&self, b: usize) -> f64;
}
