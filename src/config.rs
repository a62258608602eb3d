use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaeError};
use crate::layers::Activation;
use crate::models::VaeArchitecture;
use crate::optim::OptimizerKind;

/// Settings for a single training run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Maximum number of training epochs.
    pub epochs: usize,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Optimizer used for every step.
    pub optimizer: OptimizerKind,
    /// Optimizer learning rate.
    pub learning_rate: f32,
    /// Epochs over which the KL weight is annealed from 0 to 1.
    pub cutoff: usize,
    /// Base seed for weight init, shuffling and latent noise.
    pub seed: u64,
    /// Shuffle the training split every epoch.
    pub shuffle: bool,
    /// Directory containing `data_matrix0.npy` .. `data_matrix6.npy`.
    pub data_dir: PathBuf,
    /// Directory receiving loss curves, weights and topology diagrams.
    pub output_dir: PathBuf,
    /// Persist loss curves and weights after training.
    pub save: bool,
    /// Run label used in artifact file names.
    pub name: String,
    /// Write encoder/decoder topology diagrams when a model is built.
    pub diagrams: bool,
    /// Root directory for JSONL/CSV metric logs.
    pub log_dir: Option<String>,
    /// Experiment sub-directory for metric logs.
    pub experiment: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 128,
            optimizer: OptimizerKind::Adam,
            learning_rate: 0.001,
            cutoff: 5,
            seed: 0,
            shuffle: true,
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            save: false,
            name: String::new(),
            diagrams: true,
            log_dir: None,
            experiment: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(VaeError::Config("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(VaeError::Config("batch_size must be positive".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(VaeError::Config("learning_rate must be positive".into()));
        }
        Ok(())
    }
}

/// Grid explored by the architecture sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub latent_dims: Vec<usize>,
    /// Narrowest hidden width `d`; the stacks are `[d, 2d]` / `[2d, d]`.
    pub min_dims: Vec<usize>,
    pub cutoffs: Vec<usize>,
    pub activation: Activation,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            latent_dims: vec![20],
            min_dims: vec![64, 128, 256, 512, 1024],
            cutoffs: vec![1, 2, 4, 8, 12],
            activation: Activation::Relu,
        }
    }
}

/// Top-level configuration file: `[train]`, `[architecture]` and `[sweep]`
/// tables, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub train: TrainConfig,
    pub architecture: Option<VaeArchitecture>,
    pub sweep: SweepConfig,
}

impl Config {
    /// Load configuration from the given path. Supports TOML or JSON based on
    /// the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let cfg: Config = if path.extension().map_or(false, |e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content).map_err(|e| VaeError::Config(e.to_string()))?
        };
        cfg.train.validate()?;
        if let Some(arch) = &cfg.architecture {
            arch.validate()?;
        }
        Ok(cfg)
    }

    /// Load from `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_tables() {
        let cfg: Config = toml::from_str(
            r#"
            [train]
            epochs = 3
            name = "tiny"

            [architecture]
            encoder_dims = [8]
            encoder_activations = ["relu"]
            decoder_dims = [8]
            decoder_activations = ["tanh"]
            latent_dim = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.train.epochs, 3);
        assert_eq!(cfg.train.batch_size, 128);
        let arch = cfg.architecture.unwrap();
        assert_eq!(arch.input_dim, 448);
        assert_eq!(arch.decoder_activations, vec![Activation::Tanh]);
        assert_eq!(cfg.sweep.cutoffs, vec![1, 2, 4, 8, 12]);
    }
}
