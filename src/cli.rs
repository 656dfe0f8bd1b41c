use std::env;
use std::path::PathBuf;

pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    /// Evaluate an existing schema instead of building one from the design.
    pub schema: Option<PathBuf>,
    pub worker: Option<String>,
    pub breakdown: bool,
    pub no_control: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub trace_out: Option<PathBuf>,
    pub breakdown_out: Option<PathBuf>,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions {
        config: None,
        preset: None,
        schema: None,
        worker: None,
        breakdown: false,
        no_control: false,
        quiet: false,
        verbose: false,
        trace_out: None,
        breakdown_out: None,
    };

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --config (expected a TOML file path)",
                )?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--schema" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --schema (expected a JSON file path)",
                )?;
                if opts.schema.replace(PathBuf::from(path)).is_some() {
                    return Err("--schema provided more than once".to_string());
                }
            }
            "--worker" => {
                i += 1;
                let id = args.next_or_err(i, "missing value for --worker (expected an id)")?;
                if opts.worker.replace(id.to_string()).is_some() {
                    return Err("--worker provided more than once".to_string());
                }
            }
            "--trace-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --trace-out (expected a file path)",
                )?;
                if opts.trace_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--trace-out provided more than once".to_string());
                }
            }
            "--breakdown-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --breakdown-out (expected a file path)",
                )?;
                if opts.breakdown_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--breakdown-out provided more than once".to_string());
                }
            }
            "--breakdown" => opts.breakdown = true,
            "--no-control" => opts.no_control = true,
            "--quiet" | "-q" => opts.quiet = true,
            "--verbose" | "-v" => opts.verbose = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.config.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if opts.schema.is_some() && opts.worker.is_some() {
        return Err("`--worker` only applies when the schema is built from a design".to_string());
    }
    if opts.quiet && opts.verbose {
        return Err("arguments `--quiet` and `--verbose` are mutually exclusive".to_string());
    }

    if opts.config.is_none() && opts.preset.is_none() {
        opts.preset = Some("baseline".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("mpc-design-eval: score a district design under receding-horizon battery control");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  mpc-design-eval [--config <path> | --preset <name>] [--schema <path> | --worker <id>]"
    );
    eprintln!("                  [--breakdown] [--no-control] [--quiet | --verbose]");
    eprintln!("                  [--trace-out <path>] [--breakdown-out <path>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>      Load district, design, pricing and options from TOML");
    eprintln!("  --preset <name>      Use a built-in preset (baseline, operational, no_storage)");
    eprintln!("  --schema <path>      Evaluate an existing schema JSON instead of the design");
    eprintln!("  --worker <id>        Worker id naming the transient schema");
    eprintln!("  --breakdown          Print every objective contribution");
    eprintln!("  --no-control         Apply the zero action at every step");
    eprintln!("  --quiet, -q          Suppress progress output");
    eprintln!("  --verbose, -v        Log per-solve timing");
    eprintln!("  --trace-out <path>   Export the per-step control trace to CSV");
    eprintln!("  --breakdown-out <path>");
    eprintln!("                       Export the objective contributions to CSV");
    eprintln!();
    eprintln!("If no --config or --preset is given, the baseline preset is used.");
}
