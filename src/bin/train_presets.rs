use std::process::ExitCode;

use pianoroll_vae::data::Dataset;
use pianoroll_vae::presets::{self, Preset, PRESETS};
use pianoroll_vae::trainer::TrainingSession;
use pianoroll_vae::VaeError;

mod common;

/// Train the named presets (all of them when none are given) one after the
/// other and print each final validation loss.
fn run() -> pianoroll_vae::Result<()> {
    let cli = common::parse_env();
    let cfg = common::load_config(&cli)?;
    let selected: Vec<&Preset> = if cli.positional.is_empty() {
        PRESETS.iter().collect()
    } else {
        cli.positional
            .iter()
            .map(|n| presets::find(n).ok_or_else(|| VaeError::Config(format!("unknown preset {n}"))))
            .collect::<Result<_, _>>()?
    };

    let data = Dataset::load(&cfg.train.data_dir)?;
    for preset in selected {
        log::info!("-----------{}-------------", preset.name);
        let mut train_cfg = preset.train_config(&cfg.train);
        if let Some(e) = cli.epochs {
            train_cfg.epochs = e;
        }
        let mut session = TrainingSession::new(preset.architecture(), train_cfg)?;
        let loss = session.train(&data, &mut [])?;
        println!("{}\t{}", preset.name, loss);
    }
    Ok(())
}

fn main() -> ExitCode {
    common::init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("preset training failed: {e}");
            ExitCode::FAILURE
        }
    }
}
