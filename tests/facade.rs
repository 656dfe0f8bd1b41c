//! Integration tests for building, evaluating and cleaning up design schemas.

mod common;

use common::{ScriptedBackend, demo_pricing, files_in, small_district, two_building_design};
use mpc_design_eval::design::DesignParameters;
use mpc_design_eval::error::{EnvError, EvalError};
use mpc_design_eval::evaluate::{
    EvalOptions, Evaluation, FacadeOptions, WorkerId, construct_and_evaluate_system,
    evaluate_system,
};
use mpc_design_eval::objective::ContributionKind;
use mpc_design_eval::pricing::PricingModel;
use mpc_design_eval::schema::{JsonSchemaBuilder, SchemaBuilder, SchemaRequest};

fn quiet() -> EvalOptions {
    EvalOptions {
        tau: 6,
        suppress_output: true,
        ..EvalOptions::default()
    }
}

fn with_worker(worker: Option<WorkerId>) -> FacadeOptions {
    FacadeOptions {
        worker,
        return_contrs: false,
        eval: quiet(),
    }
}

#[test]
fn worker_schema_is_removed_after_evaluation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(1.0);
    let builder = JsonSchemaBuilder::new(dir.path());
    let worker = Some(WorkerId::named("w7").unwrap());

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &two_building_design(),
        &small_district(dir.path()),
        &demo_pricing(),
        10.0,
        &with_worker(worker),
    );

    result.expect("evaluation should succeed");
    let opened = backend.opened.borrow().clone();
    assert_eq!(opened, vec![dir.path().join("design_schema_w7.json")]);
    assert!(!opened[0].exists());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn canonical_schema_is_kept() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(1.0);
    let builder = JsonSchemaBuilder::new(dir.path());

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &two_building_design(),
        &small_district(dir.path()),
        &demo_pricing(),
        10.0,
        &with_worker(None),
    );

    result.expect("evaluation should succeed");
    assert!(dir.path().join("schema.json").exists());
    assert_eq!(files_in(dir.path()), vec!["schema.json".to_string()]);
}

#[test]
fn worker_schema_is_removed_after_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend {
        fail_step: Some(3),
        ..ScriptedBackend::new(1.0)
    };
    let builder = JsonSchemaBuilder::new(dir.path());

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &two_building_design(),
        &small_district(dir.path()),
        &demo_pricing(),
        10.0,
        &with_worker(Some(WorkerId::generate())),
    );

    assert!(matches!(result, Err(EvalError::Environment(EnvError::Setup(_)))));
    assert_eq!(backend.opened.borrow().len(), 1);
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn invalid_design_fails_before_any_schema_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(1.0);
    let out = dir.path().join("schemas");
    let builder = JsonSchemaBuilder::new(&out);
    let design = DesignParameters::new(vec![8.0, -1.0], vec![0.9], vec![4.0, 0.0]);

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &design,
        &small_district(&out),
        &demo_pricing(),
        10.0,
        &with_worker(Some(WorkerId::generate())),
    );

    let Err(EvalError::Config(errors)) = &result else {
        panic!("expected configuration errors, got {result:?}");
    };
    assert!(errors.0.iter().any(|e| e.field == "design.battery_efficiencies"));
    assert!(!out.exists());
    assert!(backend.opened.borrow().is_empty());
}

#[test]
fn returns_objective_or_breakdown_on_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(2.0);
    let builder = JsonSchemaBuilder::new(dir.path());
    let run = |return_contrs| {
        construct_and_evaluate_system(
            &backend,
            &builder,
            &two_building_design(),
            &small_district(dir.path()),
            &demo_pricing(),
            10.0,
            &FacadeOptions {
                worker: Some(WorkerId::generate()),
                return_contrs,
                eval: quiet(),
            },
        )
    };

    let scalar = run(false).unwrap();
    let full = run(true).unwrap();
    assert!(matches!(scalar, Evaluation::Objective(_)));
    let Evaluation::Breakdown(result) = &full else {
        panic!("expected a breakdown, got {full:?}");
    };
    assert_eq!(result.objective_contrs.len(), 4);
    assert_eq!(result.contribution(ContributionKind::BatteryCapex), Some(8.0 * 1e3));
    assert_eq!(result.contribution(ContributionKind::SolarCapex), Some(4.0 * 2e3));
    assert_eq!(scalar.objective(), result.objective);
}

#[test]
fn zero_consumption_without_assets_scores_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(0.0);
    let builder = JsonSchemaBuilder::new(dir.path());
    let design = DesignParameters::new(vec![0.0], vec![1.0], vec![0.0]);

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &design,
        &small_district(dir.path()),
        &demo_pricing(),
        10.0,
        &with_worker(Some(WorkerId::generate())),
    );

    assert_eq!(result.unwrap().objective(), 0.0);
}

#[test]
fn evaluating_an_existing_schema_leaves_it_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = JsonSchemaBuilder::new(dir.path());
    let request = SchemaRequest::new(
        &small_district(dir.path()),
        &two_building_design(),
        "reference",
    );
    let path = builder.build(&request).expect("schema should be written");

    let result = evaluate_system(
        &ScriptedBackend::new(1.0),
        &path,
        &demo_pricing(),
        10.0,
        &quiet(),
    );

    result.expect("evaluation should succeed");
    assert!(path.exists());
}

#[test]
fn missing_schema_is_a_schema_error() {
    let result = evaluate_system(
        &ScriptedBackend::new(1.0),
        std::path::Path::new("/nonexistent/design_schema_x.json"),
        &demo_pricing(),
        10.0,
        &quiet(),
    );
    assert!(matches!(result, Err(EvalError::Schema(_))));
}

#[test]
fn distinct_workers_do_not_collide() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(1.0);
    let builder = JsonSchemaBuilder::new(dir.path());
    for _ in 0..3 {
        let result = construct_and_evaluate_system(
            &backend,
            &builder,
            &two_building_design(),
            &small_district(dir.path()),
            &demo_pricing(),
            10.0,
            &with_worker(Some(WorkerId::generate())),
        );
        result.expect("evaluation should succeed");
    }
    let mut opened = backend.opened.borrow().clone();
    opened.sort();
    opened.dedup();
    assert_eq!(opened.len(), 3);
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn invalid_literal_pricing_fails_before_any_schema_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = ScriptedBackend::new(1.0);
    let builder = JsonSchemaBuilder::new(dir.path());
    let pricing = PricingModel {
        carbon: -0.05,
        battery: f64::NAN,
        solar: 2e3,
    };

    let result = construct_and_evaluate_system(
        &backend,
        &builder,
        &two_building_design(),
        &small_district(dir.path()),
        &pricing,
        10.0,
        &with_worker(Some(WorkerId::generate())),
    );

    let Err(EvalError::Config(errors)) = &result else {
        panic!("expected configuration errors, got {result:?}");
    };
    assert!(errors.0.iter().any(|e| e.field == "pricing.carbon"));
    assert!(errors.0.iter().any(|e| e.field == "pricing.battery"));
    assert!(backend.opened.borrow().is_empty());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn invalid_literal_pricing_is_rejected_for_an_existing_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = JsonSchemaBuilder::new(dir.path());
    let request = SchemaRequest::new(
        &small_district(dir.path()),
        &two_building_design(),
        "reference",
    );
    let path = builder.build(&request).expect("schema should be written");
    let backend = ScriptedBackend::new(1.0);

    let result = evaluate_system(
        &backend,
        &path,
        &PricingModel {
            carbon: 0.05,
            battery: -1.0,
            solar: 0.0,
        },
        10.0,
        &quiet(),
    );

    assert!(matches!(result, Err(EvalError::Config(_))));
    assert!(backend.opened.borrow().is_empty());
}
