#![allow(dead_code)]

use std::env;
use std::path::PathBuf;

use pianoroll_vae::config::Config;
use pianoroll_vae::Result;

/// Initialise `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Arguments shared by the training binaries.
#[derive(Debug, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub name: Option<String>,
    pub epochs: Option<usize>,
    pub save: bool,
    pub log_dir: Option<String>,
    pub experiment: Option<String>,
    pub positional: Vec<String>,
}

/// Parses common CLI arguments across training binaries.
///
/// - `--config <path>` TOML or JSON configuration file.
/// - `--data-dir <dir>` directory with the `data_matrixN.npy` shards.
/// - `--out-dir <dir>` directory for loss curves, weights and diagrams.
/// - `--name <label>` run label; `--epochs <n>` epoch override.
/// - `--save` persist loss curves and weights.
/// - `--log-dir <dir>` / `--experiment <name>` metric log location.
///
/// Anything else is collected as a positional argument.
pub fn parse_cli<I>(mut args: I) -> CliArgs
where
    I: Iterator<Item = String>,
{
    let mut cli = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => cli.config = args.next(),
            "--data-dir" => cli.data_dir = args.next().map(PathBuf::from),
            "--out-dir" => cli.output_dir = args.next().map(PathBuf::from),
            "--name" => cli.name = args.next(),
            "--epochs" => cli.epochs = args.next().and_then(|n| n.parse().ok()),
            "--save" => cli.save = true,
            "--log-dir" => cli.log_dir = args.next(),
            "--experiment" => cli.experiment = args.next(),
            _ => cli.positional.push(arg),
        }
    }
    cli
}

/// Convenience wrapper that parses arguments from the current process
/// (skipping the binary name).
pub fn parse_env() -> CliArgs {
    parse_cli(env::args().skip(1))
}

/// Load the configuration named on the command line and apply overrides.
pub fn load_config(cli: &CliArgs) -> Result<Config> {
    let mut cfg = Config::load_or_default(cli.config.as_deref())?;
    let train = &mut cfg.train;
    if let Some(d) = &cli.data_dir {
        train.data_dir = d.clone();
    }
    if let Some(d) = &cli.output_dir {
        train.output_dir = d.clone();
    }
    if let Some(n) = &cli.name {
        train.name = n.clone();
    }
    if let Some(e) = cli.epochs {
        train.epochs = e;
    }
    if cli.save {
        train.save = true;
    }
    if cli.log_dir.is_some() {
        train.log_dir = cli.log_dir.clone();
    }
    if cli.experiment.is_some() {
        train.experiment = cli.experiment.clone();
    }
    train.validate()?;
    Ok(cfg)
}
