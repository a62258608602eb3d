use std::process::ExitCode;

use pianoroll_vae::data::Dataset;
use pianoroll_vae::layers::Activation;
use pianoroll_vae::models::VaeArchitecture;
use pianoroll_vae::trainer::TrainingSession;

mod common;

fn run() -> pianoroll_vae::Result<()> {
    let cli = common::parse_env();
    let cfg = common::load_config(&cli)?;
    let arch = cfg.architecture.clone().unwrap_or_else(|| {
        VaeArchitecture::uniform(vec![64, 32], vec![32, 64], 4, Activation::Relu)
    });
    let data = Dataset::load(&cfg.train.data_dir)?;
    let mut session = TrainingSession::new(arch, cfg.train)?;
    let val_loss = session.train(&data, &mut [])?;
    let test = session.evaluate(&data.test)?;
    log::info!(
        "final val_loss {:.4} test_loss {:.4} after {} epochs",
        val_loss,
        test.total,
        session.history().epochs_run()
    );
    println!("{val_loss}");
    Ok(())
}

fn main() -> ExitCode {
    common::init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("training failed: {e}");
            ExitCode::FAILURE
        }
    }
}
