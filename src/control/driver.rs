//! Step/plan/apply loop that runs an environment to completion.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::env::{ActionVector, Environment};
use crate::error::{EnvError, EvalError};
use crate::planner::{Planner, PlanningWindow};

use super::soc::SocTracker;

/// Steps between progress reports.
const PROGRESS_INTERVAL: usize = 100;

/// What happened at one control step, as seen by a [`ControlObserver`].
#[derive(Debug, Clone, Copy)]
pub struct StepRecord<'a> {
    pub step: usize,
    /// Whether the action came from a planner solve.
    pub planned: bool,
    pub actions: &'a ActionVector,
    /// Stored energy per building after the step (kWh).
    pub socs: &'a [f64],
}

/// Instrumentation hook for the control loop.
///
/// Observers see the loop but cannot influence it.
pub trait ControlObserver {
    /// Called after every successful planner solve with its wall-clock time.
    fn on_solve(&mut self, _step: usize, _elapsed: Duration) {}

    /// Called after every environment step.
    fn on_step(&mut self, _record: &StepRecord<'_>) {}
}

impl ControlObserver for () {}

impl<O: ControlObserver + ?Sized> ControlObserver for &mut O {
    fn on_solve(&mut self, step: usize, elapsed: Duration) {
        (**self).on_solve(step, elapsed);
    }

    fn on_step(&mut self, record: &StepRecord<'_>) {
        (**self).on_step(record);
    }
}

impl<A: ControlObserver, B: ControlObserver> ControlObserver for (A, B) {
    fn on_solve(&mut self, step: usize, elapsed: Duration) {
        self.0.on_solve(step, elapsed);
        self.1.on_solve(step, elapsed);
    }

    fn on_step(&mut self, record: &StepRecord<'_>) {
        self.0.on_step(record);
        self.1.on_step(record);
    }
}

/// Accumulates planner solve time. Diagnostic only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveTimer {
    pub total: Duration,
    pub solves: usize,
}

impl ControlObserver for SolveTimer {
    fn on_solve(&mut self, _step: usize, elapsed: Duration) {
        self.total += elapsed;
        self.solves += 1;
    }
}

/// Runs the receding-horizon control loop.
///
/// At step `s` the planner is consulted only when control is enabled and a
/// full window of `tau` future steps remains (`s <= time_steps - 1 - tau`).
/// Otherwise the zero action is applied. Planner and environment failures
/// are returned as-is; nothing is retried.
#[derive(Debug, Clone, Copy)]
pub struct ControlLoopDriver {
    tau: usize,
    control: bool,
    report_progress: bool,
}

impl ControlLoopDriver {
    /// Creates a driver.
    ///
    /// # Arguments
    ///
    /// * `tau` - Planning horizon in steps
    /// * `control` - Whether to consult the planner at all
    /// * `report_progress` - Whether to log progress every 100 steps
    pub fn new(tau: usize, control: bool, report_progress: bool) -> Self {
        Self {
            tau,
            control,
            report_progress,
        }
    }

    /// Whether step `step` of a `time_steps`-long episode gets a planner solve.
    pub fn plans_at(&self, step: usize, time_steps: usize) -> bool {
        self.control
            && self.tau > 0
            && time_steps
                .checked_sub(1 + self.tau)
                .is_some_and(|last| step <= last)
    }

    /// Runs `env` until it signals done, leaving it in its terminal state.
    ///
    /// # Errors
    ///
    /// Propagates planner, environment and observation-layout failures.
    pub fn run<E, P, O>(
        &self,
        env: &mut E,
        planner: &mut P,
        observer: &mut O,
    ) -> Result<(), EvalError>
    where
        E: Environment,
        P: Planner<E>,
        O: ControlObserver + ?Sized,
    {
        let time_steps = env.time_steps();
        let n = env.building_count();
        let capacities = planner.battery_capacities().to_vec();
        if capacities.len() != n {
            return Err(EvalError::Series(format!(
                "planner knows {} batteries, environment has {n} buildings",
                capacities.len()
            )));
        }
        let tracker = SocTracker::new(env.observation_names(), capacities)?;

        let observations = env.reset()?;
        let mut socs = tracker.derive(&observations)?;

        let mut step = 0;
        loop {
            if self.report_progress && step % PROGRESS_INTERVAL == 0 {
                info!(step, time_steps, "control loop progress");
            }

            let planned = self.plans_at(step, time_steps);
            let actions = if planned {
                let started = Instant::now();
                let window = PlanningWindow::new(step, self.tau, time_steps)?;
                planner.load_window(env, window, &socs)?;
                planner.set_parameters()?;
                let solution = planner.solve()?;
                let actions = normalize(&solution.first_inflows()?, tracker.capacities());
                let elapsed = started.elapsed();
                debug!(step, elapsed_ms = elapsed.as_secs_f64() * 1e3, "window solved");
                observer.on_solve(step, elapsed);
                actions
            } else {
                ActionVector::zeros(n)
            };

            let outcome = env.step(&actions)?;
            socs = tracker.derive(&outcome.observations)?;

            observer.on_step(&StepRecord {
                step,
                planned,
                actions: &actions,
                socs: &socs,
            });

            step += 1;
            if outcome.done {
                break;
            }
            if step >= time_steps {
                return Err(EnvError::Setup(format!(
                    "environment did not finish after its {time_steps} time steps"
                ))
                .into());
            }
        }

        if self.report_progress {
            info!(steps = step, "evaluation complete");
        }
        Ok(())
    }
}

/// Converts energy inflows (kWh) to fractions of each battery's capacity.
///
/// Buildings without a battery get a zero action.
fn normalize(inflows: &[f64], capacities: &[f64]) -> ActionVector {
    ActionVector(
        inflows
            .iter()
            .zip(capacities)
            .map(|(flow, capacity)| if *capacity > 0.0 { flow / capacity } else { 0.0 })
            .collect(),
    )
}
