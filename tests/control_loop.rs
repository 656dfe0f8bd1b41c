//! Integration tests for the receding-horizon control loop.

mod common;

use common::{ScriptedEnv, ScriptedPlanner};
use mpc_design_eval::control::{ControlLoopDriver, SolveTimer};
use mpc_design_eval::error::{EnvError, EvalError, PlannerError};
use mpc_design_eval::io::export::TraceRecorder;

#[test]
fn takes_every_step_and_plans_all_but_the_last_tau() {
    for (n, tau, time_steps) in [(1, 1, 5), (2, 3, 10), (3, 4, 24), (2, 9, 10)] {
        let mut env = ScriptedEnv::uniform(n, time_steps, 1.0, 4.0);
        let mut planner = ScriptedPlanner::bind(&env, 0.0);
        let mut trace = TraceRecorder::new();

        ControlLoopDriver::new(tau, true, false)
            .run(&mut env, &mut planner, &mut trace)
            .expect("run should succeed");

        assert_eq!(env.applied.len(), time_steps);
        assert_eq!(trace.rows().len(), time_steps);
        assert_eq!(planner.solves, time_steps - tau);
        assert_eq!(trace.planned_steps(), time_steps - tau);
        assert!(
            trace.rows().iter().all(|r| r.planned == (r.step < time_steps - tau)),
            "planner must never run inside the final {tau} steps"
        );
    }
}

#[test]
fn windows_start_at_each_planned_step() {
    let mut env = ScriptedEnv::uniform(2, 10, 1.0, 4.0);
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    ControlLoopDriver::new(3, true, false)
        .run(&mut env, &mut planner, &mut ())
        .expect("run should succeed");

    let starts: Vec<usize> = planner.windows.iter().map(|w| w.t_start).collect();
    assert_eq!(starts, (0..7).collect::<Vec<_>>());
    assert!(planner.windows.iter().all(|w| w.tau == 3 && w.t_start + w.tau <= 10));
}

#[test]
fn first_inflow_is_normalized_by_capacity() {
    let mut env = ScriptedEnv::uniform(3, 6, 1.0, 0.0).with_capacities(vec![4.0, 2.0, 0.0]);
    let mut planner = ScriptedPlanner::bind(&env, 0.5);
    ControlLoopDriver::new(2, true, false)
        .run(&mut env, &mut planner, &mut ())
        .expect("run should succeed");

    for (step, action) in env.applied.iter().enumerate() {
        if step < 4 {
            assert_eq!(action.as_slice(), &[0.125, 0.25, 0.0]);
        } else {
            assert!(action.is_zero(), "step {step} should take the zero action");
        }
    }
}

#[test]
fn no_control_applies_zero_actions_and_follows_environment_soc() {
    let mut env = ScriptedEnv::uniform(2, 12, 1.0, 6.0).with_initial_soc(0.25);
    let mut planner = ScriptedPlanner::bind(&env, 1.0);
    let mut trace = TraceRecorder::new();

    ControlLoopDriver::new(4, false, false)
        .run(&mut env, &mut planner, &mut trace)
        .expect("run should succeed");

    assert_eq!(planner.solves, 0);
    assert!(env.applied.iter().all(|a| a.is_zero()));
    let traced: Vec<Vec<f64>> = trace.rows().iter().map(|r| r.socs.clone()).collect();
    assert_eq!(traced, env.stored);
    assert!(traced.iter().all(|s| s == &vec![1.5, 1.5]));
}

#[test]
fn soc_is_rederived_from_observations_every_step() {
    let mut env = ScriptedEnv::uniform(1, 8, 1.0, 10.0).with_initial_soc(0.0);
    // Asks for 4 kWh per step; the environment clamps at capacity.
    let mut planner = ScriptedPlanner::bind(&env, 4.0);
    ControlLoopDriver::new(2, true, false)
        .run(&mut env, &mut planner, &mut ())
        .expect("run should succeed");

    assert_eq!(planner.seen_socs[0], vec![0.0]);
    for k in 1..planner.seen_socs.len() {
        assert_eq!(planner.seen_socs[k], env.stored[k - 1]);
    }
    assert_eq!(planner.seen_socs[3], vec![10.0]);
}

#[test]
fn layout_mismatch_fails_before_any_step() {
    let mut env = ScriptedEnv::uniform(2, 5, 1.0, 4.0).with_names(vec!["hour"; 30]);
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    let result = ControlLoopDriver::new(2, true, false)
        .run(&mut env, &mut planner, &mut ());

    assert!(matches!(
        result,
        Err(EvalError::Layout { index: 22, ref found, .. }) if found == "hour"
    ));
    assert!(env.applied.is_empty());
}

#[test]
fn short_layout_reports_missing_column() {
    let mut env = ScriptedEnv::uniform(1, 5, 1.0, 4.0).with_names(vec!["hour"; 3]);
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    let result = ControlLoopDriver::new(2, true, false)
        .run(&mut env, &mut planner, &mut ());
    assert!(matches!(result, Err(EvalError::Layout { ref found, .. }) if found == "<missing>"));
}

#[test]
fn planner_failure_is_fatal_without_fallback() {
    let mut env = ScriptedEnv::uniform(2, 10, 1.0, 4.0);
    let mut planner = ScriptedPlanner::bind(&env, 1.0).failing_on_solve(2);
    let result = ControlLoopDriver::new(3, true, false)
        .run(&mut env, &mut planner, &mut ());

    assert!(matches!(
        result,
        Err(EvalError::Planner(PlannerError::Infeasible { t_start: 2, .. }))
    ));
    // Steps 0 and 1 ran; no substitute action was applied for step 2.
    assert_eq!(env.applied.len(), 2);
}

#[test]
fn environment_failure_propagates() {
    let mut env = ScriptedEnv::uniform(2, 10, 1.0, 4.0).failing_at(4);
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    let result = ControlLoopDriver::new(3, true, false)
        .run(&mut env, &mut planner, &mut ());

    assert!(matches!(result, Err(EvalError::Environment(EnvError::Setup(_)))));
    assert_eq!(env.applied.len(), 4);
}

#[test]
fn environment_that_never_finishes_is_an_error() {
    let mut env = ScriptedEnv::uniform(1, 5, 1.0, 4.0).never_done();
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    let result = ControlLoopDriver::new(2, true, false)
        .run(&mut env, &mut planner, &mut ());

    assert!(matches!(result, Err(EvalError::Environment(EnvError::Setup(_)))));
    assert_eq!(env.applied.len(), 5);
}

#[test]
fn observers_compose() {
    let mut env = ScriptedEnv::uniform(2, 10, 1.0, 4.0);
    let mut planner = ScriptedPlanner::bind(&env, 0.0);
    let mut observers = (SolveTimer::default(), TraceRecorder::new());

    ControlLoopDriver::new(3, true, true)
        .run(&mut env, &mut planner, &mut observers)
        .expect("run should succeed");

    let (timer, trace) = observers;
    assert_eq!(timer.solves, 7);
    assert_eq!(trace.rows().len(), 10);
}
