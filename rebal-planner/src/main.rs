//! Rebal Planner - three-stage portfolio reallocation planner.
//!
//! Loads the portfolio configuration, solves the Bellman recursion, replays
//! the optimal policy along expected returns and prints the plan.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use rebal_common::config::Config;
use rebal_common::config_loader::check_modular_files;
use rebal_common::logging::init_logging;
use rebal_common::Validate;
use rebal_planner::{PlanError, PlanReport, Planner, Problem};

/// Plan a three-stage reallocation of two securities, a deposit and cash.
#[derive(Parser, Debug)]
#[command(name = "rebal-planner")]
#[command(version)]
#[command(about = "Stochastic DP planner for portfolio reallocation.", long_about = None)]
struct Cli {
    /// Single JSON configuration file
    #[arg(long, conflicts_with = "config_dir")]
    config: Option<PathBuf>,

    /// Directory holding config.json and scenarios.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn with_env_overrides(mut config: Config) -> Config {
    config.apply_env_overrides();
    config
}

/// Load from the source named on the command line. `load_with_env` already
/// applies the `REBAL_*` overrides for the default directory.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match (&cli.config, &cli.config_dir) {
        (Some(path), _) => with_env_overrides(Config::load_from(path)?),
        (None, Some(dir)) => with_env_overrides(Config::load_from_dir(dir)?),
        (None, None) => Config::load_with_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Solve the configured problem and build the report.
fn plan(config: &Config) -> std::result::Result<PlanReport, PlanError> {
    let problem = Problem::from_config(&config.portfolio)?;
    let mut planner = Planner::new(problem);
    let trajectory = planner.simulate_expected_path()?;
    let stats = planner.stats().ok_or(PlanError::NotSolved)?;
    Ok(PlanReport::generate(planner.problem(), stats, &trajectory))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let startup_start = std::time::Instant::now();

    let config = load_config(&cli)?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Rebal Planner v{}", env!("CARGO_PKG_VERSION"));
    if let Some(dir) = &cli.config_dir {
        for (file, present) in check_modular_files(Some(dir.clone())) {
            tracing::debug!(file = %file, present, "Config file");
        }
    }

    let report = plan(&config).map_err(|err| {
        tracing::error!(
            code = err.code(),
            config = err.is_config(),
            error = %err,
            "Planning failed"
        );
        err
    })?;

    match cli.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    let duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = duration.as_millis() as u64,
        final_value = report.final_value,
        "Plan completed in {:?}",
        duration
    );

    Ok(())
}
