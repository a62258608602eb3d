use serde::Serialize;

use crate::config::{SweepConfig, TrainConfig};
use crate::data::Dataset;
use crate::error::Result;
use crate::layers::Activation;
use crate::logging::Logger;
use crate::models::VaeArchitecture;
use crate::trainer::TrainingSession;
use crate::util::logging::format_new_best;

/// Describes the architecture options explored by the sweep.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    /// Candidate latent dimensionalities.
    pub latent_dims: Vec<usize>,
    /// Narrowest hidden width `d`; encoder `[d, 2d]`, decoder `[2d, d]`.
    pub min_dims: Vec<usize>,
    /// KL annealing cutoffs.
    pub cutoffs: Vec<usize>,
    /// Activation used on every hidden layer.
    pub activation: Activation,
}

impl SearchSpace {
    pub fn from_config(cfg: &SweepConfig) -> Self {
        Self {
            latent_dims: cfg.latent_dims.clone(),
            min_dims: cfg.min_dims.clone(),
            cutoffs: cfg.cutoffs.clone(),
            activation: cfg.activation,
        }
    }

    pub fn len(&self) -> usize {
        self.latent_dims.len() * self.min_dims.len() * self.cutoffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One point of the grid.
#[derive(Debug, Clone)]
pub struct Trial {
    pub index: usize,
    pub latent_dim: usize,
    pub min_dim: usize,
    pub cutoff: usize,
    pub arch: VaeArchitecture,
}

impl Trial {
    pub fn label(&self) -> String {
        format!(
            "{} x {} CUTOFF: {} LATENT DIM: {}",
            self.min_dim,
            self.min_dim * 2,
            self.cutoff,
            self.latent_dim
        )
    }
}

/// Best configuration found by a sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub best_label: Option<String>,
    pub best_loss: f32,
    pub best_trial: Option<Trial>,
    pub trials: usize,
}

#[derive(Serialize)]
struct SweepRecord<'a> {
    trial: usize,
    latent_dim: usize,
    min_dim: usize,
    cutoff: usize,
    label: &'a str,
    val_loss: f32,
    kind: &'static str,
}

/// Evaluate every combination in `space` in order latent -> width -> cutoff.
///
/// `eval` returns the final validation loss of a trial; lower is better. The
/// running best only changes on a strictly smaller loss, so ties keep the
/// earlier trial and NaN never wins.
pub fn grid_search<F>(
    space: &SearchSpace,
    mut eval: F,
    mut logger: Option<&mut Logger>,
) -> Result<SweepOutcome>
where
    F: FnMut(&Trial) -> Result<f32>,
{
    let mut best_loss = f32::INFINITY;
    let mut best_trial: Option<Trial> = None;
    let mut index = 0;
    for &latent_dim in &space.latent_dims {
        for &dim in &space.min_dims {
            for &cutoff in &space.cutoffs {
                let arch = VaeArchitecture::uniform(
                    vec![dim, dim * 2],
                    vec![dim * 2, dim],
                    latent_dim,
                    space.activation,
                );
                let trial = Trial {
                    index,
                    latent_dim,
                    min_dim: dim,
                    cutoff,
                    arch,
                };
                let label = trial.label();
                log::info!("----------- {label} -----------");
                let loss = eval(&trial)?;
                if let Some(l) = logger.as_deref_mut() {
                    l.log(&SweepRecord {
                        trial: index,
                        latent_dim,
                        min_dim: dim,
                        cutoff,
                        label: &label,
                        val_loss: loss,
                        kind: "trial",
                    });
                }
                if loss < best_loss {
                    log::info!("{}", format_new_best(&label, loss));
                    best_loss = loss;
                    best_trial = Some(trial);
                }
                index += 1;
            }
        }
    }

    let best_label = best_trial.as_ref().map(Trial::label);
    if let (Some(l), Some(t)) = (logger.as_deref_mut(), best_trial.as_ref()) {
        l.log(&SweepRecord {
            trial: t.index,
            latent_dim: t.latent_dim,
            min_dim: t.min_dim,
            cutoff: t.cutoff,
            label: best_label.as_deref().unwrap_or_default(),
            val_loss: best_loss,
            kind: "best",
        });
    }
    Ok(SweepOutcome {
        best_label,
        best_loss,
        best_trial,
        trials: index,
    })
}

/// Train a fresh model for every trial of `space` on `data` and report the
/// configuration with the lowest final validation loss.
pub fn run_sweep(
    data: &Dataset,
    base: &TrainConfig,
    space: &SearchSpace,
    logger: Option<&mut Logger>,
) -> Result<SweepOutcome> {
    grid_search(
        space,
        |trial| {
            let mut cfg = base.clone();
            cfg.cutoff = trial.cutoff;
            cfg.name = format!(
                "sweep_l{}_d{}_c{}",
                trial.latent_dim, trial.min_dim, trial.cutoff
            );
            cfg.seed = base.seed.wrapping_add(trial.index as u64);
            // the sweep log takes one record per trial, not per epoch
            cfg.log_dir = None;
            cfg.experiment = None;
            let mut session = TrainingSession::new(trial.arch.clone(), cfg)?;
            session.train(data, &mut [])
        },
        logger,
    )
}
