use std::process::ExitCode;

use pianoroll_vae::data::write_npy;
use pianoroll_vae::math::Matrix;
use pianoroll_vae::rng::{rng_from_seed, Stream};
use pianoroll_vae::weights::load_vae;
use rand_distr::{Distribution, StandardNormal};

mod common;

/// Usage: `sample_vae [weights.json] [count] [out.npy]`
///
/// Decodes `count` latent vectors drawn from the standard normal prior and
/// writes the reconstructions as a `(count, 448)` array.
fn run() -> pianoroll_vae::Result<()> {
    let cli = common::parse_env();
    let mut pos = cli.positional.into_iter();
    let path = pos.next().unwrap_or_else(|| "vae.json".to_string());
    let count: usize = pos.next().and_then(|c| c.parse().ok()).unwrap_or(8);
    let out = pos.next().unwrap_or_else(|| "samples.npy".to_string());

    let vae = load_vae(&path)?;
    let latent_dim = vae.latent_dim();
    let mut rng = rng_from_seed(0, Stream::Noise);
    let mut z = Matrix::zeros(count, latent_dim);
    for v in z.data.iter_mut() {
        *v = StandardNormal.sample(&mut rng);
    }
    let samples = vae.decode(&z);
    write_npy(&out, &samples)?;
    log::info!("wrote {count} samples to {out}");
    println!(
        "sample first values: {:?}",
        &samples.data[..10.min(samples.data.len())]
    );
    Ok(())
}

fn main() -> ExitCode {
    common::init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("sampling failed: {e}");
            ExitCode::FAILURE
        }
    }
}
