use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use des_core::init_simulation_logging_with_level;
use des_sensitivity::{ExperimentError, ExperimentRunner, InjectorKind, ModelKind, RunnerConfig};

/// Run sensitivity-analysis trials of a resiliency model under a scenario.
#[derive(Parser)]
#[command(name = "sensitivity", about, long_about = None)]
struct Cli {
    /// Model id: A (naive), G (per-request timeout), H (retries) or J (infinite retries)
    #[arg(short, long)]
    model: String,

    /// Parameter injector: latency2, load2, availability2, capacity or steady-latency
    #[arg(short, long)]
    scenario: String,

    /// Comma-separated parameter vector, e.g. `--params 400,50,0.99,80`
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    params: Vec<f64>,

    /// Number of trials, numbered from zero
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Base seed; overrides the configuration file
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory; overrides the configuration file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON runner configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn run(cli: Cli) -> Result<(), ExperimentError> {
    let model: ModelKind = cli.model.parse()?;
    let injector: InjectorKind = cli.scenario.parse()?;

    let mut config = match &cli.config {
        Some(path) => RunnerConfig::from_json_file(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let runner = ExperimentRunner::new(config);
    let outcomes = runner.run_batch(model, injector, &cli.params, cli.trials)?;
    for outcome in &outcomes {
        info!(
            name = %outcome.name,
            rows = outcome.rows,
            aborted = outcome.aborted,
            short = outcome.short,
            path = %outcome.csv_path.display(),
            "Trial written"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_simulation_logging_with_level(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "Sensitivity run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
