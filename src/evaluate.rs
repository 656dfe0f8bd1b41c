//! Design evaluation: run the control loop on a schema and score the result.
//!
//! # Concurrency
//!
//! One evaluation is single-threaded and owns its environment and planner.
//! Several evaluations may run in parallel threads or processes; the only
//! thing they share is the directory schema artifacts are written to. Each
//! concurrent call to [`construct_and_evaluate_system`] must be given its own
//! [`WorkerId`], otherwise two evaluations write the same schema file and
//! corrupt each other. Nothing here locks or detects that.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::control::{ControlLoopDriver, ControlObserver, SolveTimer};
use crate::design::DesignParameters;
use crate::env::Environment;
use crate::error::{ConfigError, EvalError};
use crate::objective::{ClipLevel, DistrictSeries, EvaluationResult, aggregate};
use crate::planner::{Planner, PlannerSetup, SelfConsumptionPlanner};
use crate::pricing::PricingModel;
use crate::schema::{
    CANONICAL_SCHEMA_FILE, CANONICAL_SCHEMA_NAME, SchemaBuilder, SchemaConfig, SchemaRequest,
};
use crate::sim::DistrictEnv;

/// Default planning horizon in steps.
pub const DEFAULT_TAU: usize = 48;

/// How a schema is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOptions {
    pub clip_level: ClipLevel,
    /// Include capital costs and extend operating costs by `opex_factor`.
    pub design: bool,
    /// Planning horizon in steps.
    pub tau: usize,
    /// Silence progress reporting.
    pub suppress_output: bool,
    /// Never consult the planner; every action is zero.
    pub no_control: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            clip_level: ClipLevel::Mixed,
            design: true,
            tau: DEFAULT_TAU,
            suppress_output: false,
            no_control: false,
        }
    }
}

impl EvalOptions {
    /// Validates the options together with the opex factor.
    pub fn validate(&self, opex_factor: f64) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !self.no_control && self.tau == 0 {
            errors.push(ConfigError::new("evaluation.tau", "must be > 0"));
        }
        if !opex_factor.is_finite() || opex_factor < 0.0 {
            errors.push(ConfigError::new(
                "evaluation.opex_factor",
                format!("must be a finite value >= 0, got {opex_factor}"),
            ));
        }
        errors
    }
}

/// Opens environments from schema paths and binds planners to them.
pub trait Backend {
    type Env: Environment;
    type Planner: Planner<Self::Env>;

    fn open_environment(&self, schema_path: &Path) -> Result<Self::Env, EvalError>;

    fn bind_planner(&self, env: &Self::Env) -> Result<Self::Planner, EvalError>;
}

/// The built-in district environment with the self-consumption planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistrictBackend;

impl Backend for DistrictBackend {
    type Env = DistrictEnv;
    type Planner = SelfConsumptionPlanner;

    fn open_environment(&self, schema_path: &Path) -> Result<DistrictEnv, EvalError> {
        Ok(DistrictEnv::from_schema_path(schema_path)?)
    }

    fn bind_planner(&self, env: &DistrictEnv) -> Result<SelfConsumptionPlanner, EvalError> {
        Ok(SelfConsumptionPlanner::bind(env))
    }
}

/// Evaluates the system described by the schema at `schema_path`.
///
/// # Errors
///
/// Returns configuration errors before any simulation step, and propagates
/// planner, environment and series failures unchanged.
pub fn evaluate_system<B: Backend>(
    backend: &B,
    schema_path: &Path,
    pricing: &PricingModel,
    opex_factor: f64,
    options: &EvalOptions,
) -> Result<EvaluationResult, EvalError> {
    evaluate_system_with(backend, schema_path, pricing, opex_factor, options, &mut ())
}

/// [`evaluate_system`] with an observer attached to the control loop.
///
/// # Errors
///
/// Same as [`evaluate_system`].
pub fn evaluate_system_with<B, O>(
    backend: &B,
    schema_path: &Path,
    pricing: &PricingModel,
    opex_factor: f64,
    options: &EvalOptions,
    observer: &mut O,
) -> Result<EvaluationResult, EvalError>
where
    B: Backend,
    O: ControlObserver + ?Sized,
{
    let mut errors = pricing.validate();
    errors.extend(options.validate(opex_factor));
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let mut env = backend.open_environment(schema_path)?;
    let mut planner = backend.bind_planner(&env)?;
    planner.configure(&PlannerSetup {
        tau: options.tau,
        clip_level: options.clip_level,
        pricing: *pricing,
        opex_factor,
    })?;

    if !options.no_control && options.tau >= env.time_steps() {
        warn!(
            tau = options.tau,
            time_steps = env.time_steps(),
            "planning horizon covers the whole episode, no step will be planned"
        );
    }

    let driver = ControlLoopDriver::new(
        options.tau,
        !options.no_control,
        !options.suppress_output,
    );
    let mut timer = SolveTimer::default();
    driver.run(&mut env, &mut planner, &mut (&mut timer, observer))?;
    debug!(
        solves = timer.solves,
        solve_secs = timer.total.as_secs_f64(),
        "planner time"
    );

    let series = DistrictSeries::from_env(&env)?;
    aggregate(
        &series,
        pricing,
        opex_factor,
        options.clip_level,
        options.design,
    )
}

/// Identifier of one logical evaluation worker.
///
/// Names the transient schema artifact so that concurrent evaluations never
/// write the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(String);

impl WorkerId {
    /// A fresh collision-resistant identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// A caller-chosen identifier of ASCII letters, digits, `-` and `_`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for empty names or names with other characters.
    pub fn named(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::new(
                "worker",
                format!("\"{name}\" must be non-empty ASCII letters, digits, '-' or '_'"),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Schema name reserved for this worker.
    pub fn schema_name(&self) -> String {
        format!("design_schema_{}", self.0)
    }
}

/// Options for [`construct_and_evaluate_system`].
#[derive(Debug, Clone, Default)]
pub struct FacadeOptions {
    /// Worker owning the transient schema; `None` writes the canonical schema.
    pub worker: Option<WorkerId>,
    /// Return the full breakdown instead of only the objective.
    pub return_contrs: bool,
    pub eval: EvalOptions,
}

/// Outcome of [`construct_and_evaluate_system`].
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Objective(f64),
    Breakdown(EvaluationResult),
}

impl Evaluation {
    pub fn objective(&self) -> f64 {
        match self {
            Evaluation::Objective(v) => *v,
            Evaluation::Breakdown(r) => r.objective,
        }
    }
}

/// Builds a schema for `design`, evaluates it and removes the schema again.
///
/// # Errors
///
/// Configuration errors are returned before the schema is written. Schema,
/// planner and environment failures are returned after cleanup.
pub fn construct_and_evaluate_system<B, S>(
    backend: &B,
    builder: &S,
    design: &DesignParameters,
    base: &SchemaConfig,
    pricing: &PricingModel,
    opex_factor: f64,
    options: &FacadeOptions,
) -> Result<Evaluation, EvalError>
where
    B: Backend,
    S: SchemaBuilder + ?Sized,
{
    construct_and_evaluate_system_with(
        backend,
        builder,
        design,
        base,
        pricing,
        opex_factor,
        options,
        &mut (),
    )
}

/// [`construct_and_evaluate_system`] with an observer attached to the control loop.
///
/// # Errors
///
/// Same as [`construct_and_evaluate_system`].
#[allow(clippy::too_many_arguments)]
pub fn construct_and_evaluate_system_with<B, S, O>(
    backend: &B,
    builder: &S,
    design: &DesignParameters,
    base: &SchemaConfig,
    pricing: &PricingModel,
    opex_factor: f64,
    options: &FacadeOptions,
    observer: &mut O,
) -> Result<Evaluation, EvalError>
where
    B: Backend,
    S: SchemaBuilder + ?Sized,
    O: ControlObserver + ?Sized,
{
    let mut errors = design.validate();
    errors.extend(base.validate());
    errors.extend(pricing.validate());
    errors.extend(options.eval.validate(opex_factor));
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let schema_name = options
        .worker
        .as_ref()
        .map_or_else(|| CANONICAL_SCHEMA_NAME.to_string(), WorkerId::schema_name);
    let request = SchemaRequest::new(base, design, schema_name);
    let schema_path = builder.build(&request)?;
    info!(
        schema = %schema_path.display(),
        buildings = design.building_count(),
        "evaluating design"
    );

    let result = evaluate_system_with(
        backend,
        &schema_path,
        pricing,
        opex_factor,
        &options.eval,
        observer,
    );
    remove_transient_schema(&schema_path);

    let result = result?;
    Ok(if options.return_contrs {
        Evaluation::Breakdown(result)
    } else {
        Evaluation::Objective(result.objective)
    })
}

/// Deletes a schema artifact unless it is the canonical `schema.json`.
///
/// Failure to delete is logged and otherwise ignored. Returns whether the
/// file was removed.
pub fn remove_transient_schema(path: &Path) -> bool {
    if path.file_name().is_some_and(|n| n == CANONICAL_SCHEMA_FILE) {
        debug!(path = %path.display(), "keeping canonical schema");
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove transient schema");
            false
        }
    }
}
