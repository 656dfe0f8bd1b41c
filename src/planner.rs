//! Receding-horizon planner contract and a rule-based reference planner.

use crate::env::{Environment, ForecastSource};
use crate::error::PlannerError;
use crate::objective::ClipLevel;
use crate::pricing::PricingModel;

/// Forecast window handed to the planner: `[t_start, t_start + tau)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningWindow {
    pub t_start: usize,
    pub tau: usize,
}

impl PlanningWindow {
    /// Creates a full-length window inside an episode of `time_steps` steps.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::WindowOutOfRange` if `tau` is zero or the window
    /// would run past the end of the episode.
    pub fn new(t_start: usize, tau: usize, time_steps: usize) -> Result<Self, PlannerError> {
        if tau == 0 || t_start + tau > time_steps {
            return Err(PlannerError::WindowOutOfRange {
                t_start,
                tau,
                time_steps,
            });
        }
        Ok(Self { t_start, tau })
    }

    pub fn steps(&self) -> std::ops::Range<usize> {
        self.t_start..self.t_start + self.tau
    }
}

/// Static planner configuration fixed for a whole evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PlannerSetup {
    pub tau: usize,
    pub clip_level: ClipLevel,
    pub pricing: PricingModel,
    pub opex_factor: f64,
}

/// Planned battery trajectory for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSolution {
    /// Battery energy inflow per building per window step (kWh; positive =
    /// charge, negative = discharge). Shape `N × tau`.
    pub battery_inflows: Vec<Vec<f64>>,
    /// Planned stored energy per building at the end of each window step (kWh).
    pub soc_trajectory: Vec<Vec<f64>>,
}

impl PlanSolution {
    /// Inflows for the first step of the window, one per building.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::Numerical` if any building has an empty trajectory.
    pub fn first_inflows(&self) -> Result<Vec<f64>, PlannerError> {
        self.battery_inflows
            .iter()
            .enumerate()
            .map(|(b, flows)| {
                flows.first().copied().ok_or_else(|| {
                    PlannerError::Numerical(format!("empty inflow trajectory for building {b}"))
                })
            })
            .collect()
    }
}

/// A receding-horizon optimizer bound to an environment of type `E`.
///
/// The control loop calls `load_window`, `set_parameters` and `solve` in that
/// order for every planned step. Any error is fatal to the evaluation.
pub trait Planner<E: ?Sized> {
    /// Fixes horizon, pricing and objective shape for the evaluation.
    fn configure(&mut self, setup: &PlannerSetup) -> Result<(), PlannerError>;

    /// Loads ground-truth window data and current battery states (kWh).
    fn load_window(
        &mut self,
        env: &E,
        window: PlanningWindow,
        socs: &[f64],
    ) -> Result<(), PlannerError>;

    /// Finalizes the problem parameters for the loaded window.
    fn set_parameters(&mut self) -> Result<(), PlannerError>;

    /// Solves the loaded window.
    fn solve(&mut self) -> Result<PlanSolution, PlannerError>;

    /// Battery capacity per building as recorded by the planner (kWh).
    fn battery_capacities(&self) -> &[f64];

    /// Pricing the planner was configured with, if any.
    fn pricing(&self) -> Option<&PricingModel>;
}

#[derive(Debug, Clone)]
struct WindowData {
    window: PlanningWindow,
    loads: Vec<Vec<f64>>,
    solar: Vec<Vec<f64>>,
    socs: Vec<f64>,
}

/// Rule-based stand-in for an optimizing planner.
///
/// Over the whole window each battery charges from surplus solar and
/// discharges to cover net demand, within its capacity and per-step limit.
#[derive(Debug, Clone)]
pub struct SelfConsumptionPlanner {
    capacities: Vec<f64>,
    efficiencies: Vec<f64>,
    step_limits: Vec<f64>,
    setup: Option<PlannerSetup>,
    data: Option<WindowData>,
    ready: bool,
}

impl SelfConsumptionPlanner {
    /// Binds a planner to `env`, recording its battery characteristics.
    pub fn bind<E: Environment + ForecastSource>(env: &E) -> Self {
        let n = env.building_count();
        Self {
            capacities: (0..n).map(|b| env.battery_capacity(b)).collect(),
            efficiencies: (0..n).map(|b| env.battery_efficiency(b)).collect(),
            step_limits: (0..n).map(|b| env.battery_step_limit(b)).collect(),
            setup: None,
            data: None,
            ready: false,
        }
    }

    /// Plans one building's window, returning `(inflows, stored energy)`.
    fn plan_building(&self, b: usize, data: &WindowData) -> (Vec<f64>, Vec<f64>) {
        let capacity = self.capacities[b];
        let limit = self.step_limits[b];
        // Round-trip losses split evenly between charge and discharge.
        let eta = self.efficiencies[b].sqrt();
        let mut stored = data.socs[b].clamp(0.0, capacity);

        let mut inflows = Vec::with_capacity(data.window.tau);
        let mut trajectory = Vec::with_capacity(data.window.tau);
        for (load, solar) in data.loads[b].iter().zip(&data.solar[b]) {
            let net = load - solar;
            let inflow = if capacity <= 0.0 {
                0.0
            } else if net < 0.0 {
                let room = (capacity - stored) / eta;
                (-net).min(limit).min(room.max(0.0))
            } else {
                let available = stored * eta;
                -net.min(limit).min(available.max(0.0))
            };

            if inflow >= 0.0 {
                stored += inflow * eta;
            } else {
                stored += inflow / eta;
            }
            stored = stored.clamp(0.0, capacity.max(0.0));

            inflows.push(inflow);
            trajectory.push(stored);
        }
        (inflows, trajectory)
    }
}

impl<E: Environment + ForecastSource> Planner<E> for SelfConsumptionPlanner {
    fn configure(&mut self, setup: &PlannerSetup) -> Result<(), PlannerError> {
        if setup.tau == 0 {
            return Err(PlannerError::NotReady(
                "planning horizon must be at least one step".to_string(),
            ));
        }
        self.setup = Some(*setup);
        Ok(())
    }

    fn load_window(
        &mut self,
        env: &E,
        window: PlanningWindow,
        socs: &[f64],
    ) -> Result<(), PlannerError> {
        let n = self.capacities.len();
        if socs.len() != n {
            return Err(PlannerError::Infeasible {
                t_start: window.t_start,
                reason: format!("got {} battery states for {n} buildings", socs.len()),
            });
        }
        if let Some(b) = socs.iter().position(|s| !s.is_finite()) {
            return Err(PlannerError::Numerical(format!(
                "non-finite battery state for building {b}"
            )));
        }
        if window.t_start + window.tau > env.time_steps() {
            return Err(PlannerError::WindowOutOfRange {
                t_start: window.t_start,
                tau: window.tau,
                time_steps: env.time_steps(),
            });
        }

        self.data = Some(WindowData {
            window,
            loads: (0..n).map(|b| env.load_forecast(b, window.steps())).collect(),
            solar: (0..n).map(|b| env.solar_forecast(b, window.steps())).collect(),
            socs: socs.to_vec(),
        });
        self.ready = false;
        Ok(())
    }

    fn set_parameters(&mut self) -> Result<(), PlannerError> {
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| PlannerError::NotReady("planner has not been configured".into()))?;
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| PlannerError::NotReady("no window data loaded".into()))?;
        if data.window.tau != setup.tau {
            return Err(PlannerError::NotReady(format!(
                "window length {} differs from configured horizon {}",
                data.window.tau, setup.tau
            )));
        }
        self.ready = true;
        Ok(())
    }

    fn solve(&mut self) -> Result<PlanSolution, PlannerError> {
        if !self.ready {
            return Err(PlannerError::NotReady(
                "parameters not set for the loaded window".into(),
            ));
        }
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| PlannerError::NotReady("no window data loaded".into()))?;

        let (battery_inflows, soc_trajectory): (Vec<_>, Vec<_>) = (0..self.capacities.len())
            .map(|b| self.plan_building(b, data))
            .unzip();
        Ok(PlanSolution {
            battery_inflows,
            soc_trajectory,
        })
    }

    fn battery_capacities(&self) -> &[f64] {
        &self.capacities
    }

    fn pricing(&self) -> Option<&PricingModel> {
        self.setup.as_ref().map(|s| &s.pricing)
    }
}
