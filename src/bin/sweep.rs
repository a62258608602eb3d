use std::process::ExitCode;

use pianoroll_vae::data::Dataset;
use pianoroll_vae::logging::Logger;
use pianoroll_vae::sweep::{run_sweep, SearchSpace};

mod common;

fn run() -> pianoroll_vae::Result<()> {
    let cli = common::parse_env();
    let mut cfg = common::load_config(&cli)?;
    // the sweep compares runs by their final loss only
    cfg.train.save = false;
    cfg.train.diagrams = false;

    let space = SearchSpace::from_config(&cfg.sweep);
    log::info!("sweeping {} configurations", space.len());
    let data = Dataset::load(&cfg.train.data_dir)?;
    let mut logger = match Logger::new(cfg.train.log_dir.clone(), cfg.train.experiment.clone()) {
        Ok(l) => Some(l),
        Err(e) => {
            log::warn!("sweep log disabled: {e}");
            None
        }
    };
    let outcome = run_sweep(&data, &cfg.train, &space, logger.as_mut())?;
    match outcome.best_label {
        Some(label) => {
            println!("{label}");
            println!("{}", outcome.best_loss);
        }
        None => log::warn!("no trial produced a finite validation loss"),
    }
    Ok(())
}

fn main() -> ExitCode {
    common::init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("sweep failed: {e}");
            ExitCode::FAILURE
        }
    }
}
