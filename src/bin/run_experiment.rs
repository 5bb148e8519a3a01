// src/bin/run_experiment.rs

//! Command-line experiment driver: load a JSON parameter file, run the
//! configured trials, and drop the tick/day/trader CSV tables next to the
//! config file.
//!
//! Usage: run_experiment <config.json> [base_seed]

use network_cda::experiment::{self, ExperimentConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: run_experiment <config.json> [base_seed]");
        return ExitCode::from(2);
    };
    let base_seed = match args.next() {
        Some(raw) => match raw.parse::<u64>() {
            Ok(seed) => seed,
            Err(_) => {
                eprintln!("base_seed must be an unsigned integer, got '{}'", raw);
                return ExitCode::from(2);
            }
        },
        None => 0,
    };

    if let Err(err) = run(&config_path, base_seed) {
        eprintln!("run_experiment: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(config_path: &Path, base_seed: u64) -> network_cda::error::Result<()> {
    let config = ExperimentConfig::from_file(config_path)?;
    log::info!(
        "running {} trials of {} traders per side over {} days (seed {})",
        config.trials,
        config.n_per_side(),
        config.days,
        base_seed
    );

    let output = experiment::run(&config, base_seed)?;
    experiment::write_csv(&output, config_path)?;

    log::info!(
        "wrote {} tick rows and {} day rows",
        output.ticks.len(),
        output.days.len()
    );
    Ok(())
}
