//! Design evaluator entry point: CLI wiring and config-driven evaluation.

mod cli;

use std::process;

use tracing::info;

use mpc_design_eval::config::EvaluationConfig;
use mpc_design_eval::evaluate::{
    DistrictBackend, Evaluation, FacadeOptions, WorkerId, construct_and_evaluate_system_with,
    evaluate_system_with,
};
use mpc_design_eval::io::export::{TraceRecorder, export_breakdown, export_trace};
use mpc_design_eval::logging::init_tracing;
use mpc_design_eval::schema::JsonSchemaBuilder;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn main() {
    let cli = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });
    init_tracing(cli.verbose);

    // Load config: --config takes priority, then --preset
    let mut cfg = match (&cli.config, &cli.preset) {
        (Some(path), _) => EvaluationConfig::from_toml_file(path),
        (None, Some(name)) => EvaluationConfig::from_preset(name),
        (None, None) => Ok(EvaluationConfig::baseline()),
    }
    .unwrap_or_else(|e| fail(e));

    if cli.no_control {
        cfg.evaluation.no_control = true;
    }

    // An existing schema already fixes the district and the design.
    let errors = if cli.schema.is_some() {
        cfg.validate_scoring()
    } else {
        cfg.validate()
    };
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let pricing = cfg.pricing_model().unwrap_or_else(|errors| {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    });
    let options = cfg.eval_options(cli.quiet);
    let opex_factor = cfg.evaluation.opex_factor;
    let mut recorder = TraceRecorder::new();

    let evaluation = if let Some(ref schema) = cli.schema {
        evaluate_system_with(
            &DistrictBackend,
            schema,
            &pricing,
            opex_factor,
            &options,
            &mut recorder,
        )
        .map(Evaluation::Breakdown)
    } else {
        let worker = match cli.worker.as_deref() {
            Some(name) => Some(WorkerId::named(name).unwrap_or_else(|e| fail(e))),
            None => None,
        };
        let builder = JsonSchemaBuilder::new(&cfg.district.output_dir);
        let facade = FacadeOptions {
            worker,
            return_contrs: cli.breakdown || cli.breakdown_out.is_some(),
            eval: options,
        };
        construct_and_evaluate_system_with(
            &DistrictBackend,
            &builder,
            &cfg.design,
            &cfg.district,
            &pricing,
            opex_factor,
            &facade,
            &mut recorder,
        )
    }
    .unwrap_or_else(|e| fail(format!("error: {e}")));

    match &evaluation {
        Evaluation::Breakdown(result) if cli.breakdown => println!("{result}"),
        other => println!("objective: {:.4}", other.objective()),
    }

    if let (Some(path), Evaluation::Breakdown(result)) = (&cli.breakdown_out, &evaluation) {
        if let Err(e) = export_breakdown(result, path) {
            fail(format!("error: failed to write CSV: {e}"));
        }
        info!(path = %path.display(), "objective breakdown written");
    }

    if let Some(ref path) = cli.trace_out {
        if let Err(e) = export_trace(recorder.rows(), path) {
            fail(format!("error: failed to write CSV: {e}"));
        }
        info!(
            path = %path.display(),
            steps = recorder.rows().len(),
            planned = recorder.planned_steps(),
            "control trace written"
        );
    }
}
