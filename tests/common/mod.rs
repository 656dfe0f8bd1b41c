//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use mpc_design_eval::design::DesignParameters;
use mpc_design_eval::env::{ActionVector, Environment, Observations, StepOutcome};
use mpc_design_eval::error::{EnvError, EvalError, PlannerError};
use mpc_design_eval::evaluate::Backend;
use mpc_design_eval::planner::{PlanSolution, Planner, PlannerSetup, PlanningWindow};
use mpc_design_eval::pricing::PricingModel;
use mpc_design_eval::schema::{DistrictSchema, SchemaConfig};
use mpc_design_eval::sim::observation::{ELECTRICAL_STORAGE_SOC, OBSERVATION_NAMES};

/// Pricing used throughout the demo configuration.
pub fn demo_pricing() -> PricingModel {
    PricingModel {
        carbon: 0.05,
        battery: 1e3,
        solar: 2e3,
    }
}

/// A one-day, hourly district with schemas written to `output_dir`.
pub fn small_district(output_dir: &Path) -> SchemaConfig {
    SchemaConfig {
        output_dir: output_dir.to_path_buf(),
        steps_per_day: 24,
        days: 1,
        ..SchemaConfig::default()
    }
}

/// Two buildings, one with storage and solar, one with neither.
pub fn two_building_design() -> DesignParameters {
    DesignParameters::new(vec![8.0, 0.0], vec![0.9, 0.9], vec![4.0, 0.0])
}

/// Environment replaying fixed per-building consumption.
///
/// Batteries move exactly the requested energy, clamped to `[0, capacity]`,
/// and the stored fraction is published in the standard SoC column.
#[derive(Debug, Clone)]
pub struct ScriptedEnv {
    names: Vec<&'static str>,
    base: Vec<Vec<f64>>,
    pricing: Vec<f64>,
    carbon: Vec<f64>,
    capacities: Vec<f64>,
    solar_kwp: Vec<f64>,
    initial_soc: f64,
    fail_step: Option<usize>,
    never_done: bool,
    socs: Vec<f64>,
    t: usize,
    net: Vec<Vec<f64>>,
    prices_seen: Vec<f64>,
    carbon_seen: Vec<f64>,
    cap_history: Vec<Vec<f64>>,
    /// Every action applied, in order.
    pub applied: Vec<ActionVector>,
    /// Stored energy per building after each step (kWh).
    pub stored: Vec<Vec<f64>>,
}

impl ScriptedEnv {
    /// `base[b][t]` is the consumption of building `b` at step `t` before
    /// battery flow; the episode lasts `pricing.len()` steps.
    pub fn new(
        base: Vec<Vec<f64>>,
        pricing: Vec<f64>,
        carbon: Vec<f64>,
        capacities: Vec<f64>,
    ) -> Self {
        let n = base.len();
        Self {
            names: OBSERVATION_NAMES.to_vec(),
            base,
            pricing,
            carbon,
            solar_kwp: vec![0.0; n],
            capacities,
            initial_soc: 0.5,
            fail_step: None,
            never_done: false,
            socs: vec![0.0; n],
            t: 0,
            net: vec![Vec::new(); n],
            prices_seen: Vec::new(),
            carbon_seen: Vec::new(),
            cap_history: vec![Vec::new(); n],
            applied: Vec::new(),
            stored: Vec::new(),
        }
    }

    /// `n` buildings with constant consumption over `time_steps` steps at
    /// unit price and unit carbon intensity.
    pub fn uniform(n: usize, time_steps: usize, consumption: f64, capacity: f64) -> Self {
        Self::new(
            vec![vec![consumption; time_steps]; n],
            vec![1.0; time_steps],
            vec![1.0; time_steps],
            vec![capacity; n],
        )
    }

    pub fn with_names(mut self, names: Vec<&'static str>) -> Self {
        self.names = names;
        self
    }

    pub fn with_capacities(mut self, capacities: Vec<f64>) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn with_solar(mut self, solar_kwp: Vec<f64>) -> Self {
        self.solar_kwp = solar_kwp;
        self
    }

    pub fn with_initial_soc(mut self, soc: f64) -> Self {
        self.initial_soc = soc;
        self
    }

    pub fn failing_at(mut self, step: usize) -> Self {
        self.fail_step = Some(step);
        self
    }

    pub fn never_done(mut self) -> Self {
        self.never_done = true;
        self
    }

    fn observe(&self) -> Observations {
        Observations::new(
            self.socs
                .iter()
                .map(|soc| {
                    let mut row = vec![0.0; self.names.len()];
                    if let Some(cell) = row.get_mut(ELECTRICAL_STORAGE_SOC) {
                        *cell = *soc;
                    }
                    row
                })
                .collect(),
        )
    }
}

impl Environment for ScriptedEnv {
    fn building_count(&self) -> usize {
        self.base.len()
    }

    fn time_steps(&self) -> usize {
        self.pricing.len()
    }

    fn observation_names(&self) -> &[&'static str] {
        &self.names
    }

    fn reset(&mut self) -> Result<Observations, EnvError> {
        self.t = 0;
        self.socs = self
            .capacities
            .iter()
            .map(|c| if *c > 0.0 { self.initial_soc } else { 0.0 })
            .collect();
        self.net.iter_mut().for_each(Vec::clear);
        self.prices_seen.clear();
        self.carbon_seen.clear();
        self.cap_history = self.capacities.iter().map(|c| vec![*c]).collect();
        self.applied.clear();
        self.stored.clear();
        Ok(self.observe())
    }

    fn step(&mut self, actions: &ActionVector) -> Result<StepOutcome, EnvError> {
        if self.fail_step == Some(self.t) {
            return Err(EnvError::Setup(format!("scripted failure at step {}", self.t)));
        }
        let n = self.base.len();
        if actions.len() != n {
            return Err(EnvError::ActionShape {
                expected: n,
                got: actions.len(),
            });
        }
        let t = self.t;
        if t >= self.time_steps() {
            return Err(EnvError::Finished(self.time_steps()));
        }

        for b in 0..n {
            let cap = self.capacities[b];
            let before = self.socs[b] * cap;
            let after = (before + actions.as_slice()[b] * cap).clamp(0.0, cap);
            self.socs[b] = if cap > 0.0 { after / cap } else { 0.0 };
            self.net[b].push(self.base[b][t] + (after - before));
            self.cap_history[b].push(cap);
        }
        self.prices_seen.push(self.pricing[t]);
        self.carbon_seen.push(self.carbon[t]);
        self.applied.push(actions.clone());
        self.stored.push(
            self.socs
                .iter()
                .zip(&self.capacities)
                .map(|(s, c)| s * c)
                .collect(),
        );
        self.t += 1;

        Ok(StepOutcome {
            observations: self.observe(),
            reward: 0.0,
            done: !self.never_done && self.t >= self.time_steps(),
        })
    }

    fn net_electricity_consumption(&self, b: usize) -> &[f64] {
        &self.net[b]
    }

    fn electricity_pricing(&self) -> &[f64] {
        &self.prices_seen
    }

    fn carbon_intensity(&self) -> &[f64] {
        &self.carbon_seen
    }

    fn capacity_history(&self, b: usize) -> &[f64] {
        &self.cap_history[b]
    }

    fn nominal_solar_power(&self, b: usize) -> f64 {
        self.solar_kwp[b]
    }
}

/// Planner that asks every battery to take in `inflow_kwh` at every step.
#[derive(Debug, Clone)]
pub struct ScriptedPlanner {
    capacities: Vec<f64>,
    inflow_kwh: f64,
    fail_on_solve: Option<usize>,
    loaded: Option<PlanningWindow>,
    parameters_set: bool,
    pub setup: Option<PlannerSetup>,
    /// Every window loaded, in order.
    pub windows: Vec<PlanningWindow>,
    /// SoC vector passed with each window (kWh).
    pub seen_socs: Vec<Vec<f64>>,
    pub solves: usize,
}

impl ScriptedPlanner {
    pub fn bind(env: &ScriptedEnv, inflow_kwh: f64) -> Self {
        Self {
            capacities: env.capacities.clone(),
            inflow_kwh,
            fail_on_solve: None,
            loaded: None,
            parameters_set: false,
            setup: None,
            windows: Vec::new(),
            seen_socs: Vec::new(),
            solves: 0,
        }
    }

    /// Fails the solve with zero-based index `nth`.
    pub fn failing_on_solve(mut self, nth: usize) -> Self {
        self.fail_on_solve = Some(nth);
        self
    }
}

impl Planner<ScriptedEnv> for ScriptedPlanner {
    fn configure(&mut self, setup: &PlannerSetup) -> Result<(), PlannerError> {
        self.setup = Some(*setup);
        Ok(())
    }

    fn load_window(
        &mut self,
        _env: &ScriptedEnv,
        window: PlanningWindow,
        socs: &[f64],
    ) -> Result<(), PlannerError> {
        self.loaded = Some(window);
        self.parameters_set = false;
        self.windows.push(window);
        self.seen_socs.push(socs.to_vec());
        Ok(())
    }

    fn set_parameters(&mut self) -> Result<(), PlannerError> {
        if self.loaded.is_none() {
            return Err(PlannerError::NotReady("no window loaded".to_string()));
        }
        self.parameters_set = true;
        Ok(())
    }

    fn solve(&mut self) -> Result<PlanSolution, PlannerError> {
        let Some(window) = self.loaded.filter(|_| self.parameters_set) else {
            return Err(PlannerError::NotReady("parameters not set".to_string()));
        };
        if self.fail_on_solve == Some(self.solves) {
            return Err(PlannerError::Infeasible {
                t_start: window.t_start,
                reason: "scripted".to_string(),
            });
        }
        self.solves += 1;
        let n = self.capacities.len();
        Ok(PlanSolution {
            battery_inflows: vec![vec![self.inflow_kwh; window.tau]; n],
            soc_trajectory: vec![vec![0.0; window.tau]; n],
        })
    }

    fn battery_capacities(&self) -> &[f64] {
        &self.capacities
    }

    fn pricing(&self) -> Option<&PricingModel> {
        self.setup.as_ref().map(|s| &s.pricing)
    }
}

/// Backend that reads the schema for its building sizes and replays constant
/// consumption. Remembers which schema paths it opened.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub consumption: f64,
    pub inflow_kwh: f64,
    pub fail_step: Option<usize>,
    pub opened: RefCell<Vec<PathBuf>>,
}

impl ScriptedBackend {
    pub fn new(consumption: f64) -> Self {
        Self {
            consumption,
            ..Self::default()
        }
    }
}

impl Backend for ScriptedBackend {
    type Env = ScriptedEnv;
    type Planner = ScriptedPlanner;

    fn open_environment(&self, schema_path: &Path) -> Result<ScriptedEnv, EvalError> {
        let schema = DistrictSchema::load(schema_path)?;
        self.opened.borrow_mut().push(schema_path.to_path_buf());
        let n = schema.buildings.len();
        let time_steps = schema
            .time_steps()
            .ok_or_else(|| EnvError::Setup("step count overflows".to_string()))?;
        let env = ScriptedEnv::uniform(n, time_steps, self.consumption, 0.0)
            .with_capacities(
                schema
                    .buildings
                    .iter()
                    .map(|b| b.battery.capacity_kwh)
                    .collect(),
            )
            .with_solar(
                schema
                    .buildings
                    .iter()
                    .map(|b| b.pv_nominal_power_kw)
                    .collect(),
            );
        Ok(match self.fail_step {
            Some(step) => env.failing_at(step),
            None => env,
        })
    }

    fn bind_planner(&self, env: &ScriptedEnv) -> Result<ScriptedPlanner, EvalError> {
        Ok(ScriptedPlanner::bind(env, self.inflow_kwh))
    }
}

/// Names of the files currently in `dir`, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("output directory should exist")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
