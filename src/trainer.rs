use indicatif::ProgressBar;
use rand::rngs::StdRng;

use crate::anneal::KlAnnealing;
use crate::config::TrainConfig;
use crate::data::{DataLoader, Dataset};
use crate::error::{Result, VaeError};
use crate::history::History;
use crate::logging::{Callback, CallbackSignal, EarlyStopping, Logger, MetricRecord};
use crate::loss::{vae_loss, LossOutput};
use crate::math::{self, Matrix};
use crate::models::{Vae, VaeArchitecture};
use crate::optim::Optimizer;
use crate::rng::{rng_from_seed, Stream};
use crate::topology;
use crate::util::logging::{format_epoch, log_total_ops};
use crate::weights::save_vae;

/// Sample-weighted mean loss over a split.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EvalLoss {
    pub total: f32,
    pub reconstruction: f32,
    pub kl: f32,
}

#[derive(Default)]
struct RunningLoss {
    total: f64,
    reconstruction: f64,
    kl: f64,
    seen: usize,
}

impl RunningLoss {
    fn add(&mut self, loss: &LossOutput, rows: usize) {
        let w = rows as f64;
        self.total += loss.total as f64 * w;
        self.reconstruction += loss.reconstruction as f64 * w;
        self.kl += loss.kl as f64 * w;
        self.seen += rows;
    }

    fn mean(&self) -> EvalLoss {
        let n = self.seen.max(1) as f64;
        EvalLoss {
            total: (self.total / n) as f32,
            reconstruction: (self.reconstruction / n) as f32,
            kl: (self.kl / n) as f32,
        }
    }
}

/// One training run: the model, its optimizer and the state that the loss
/// and the annealing step share (the current KL weight and the RNGs).
pub struct TrainingSession {
    pub vae: Vae,
    pub config: TrainConfig,
    optimizer: Box<dyn Optimizer>,
    schedule: KlAnnealing,
    beta: f32,
    noise_rng: StdRng,
    shuffle_rng: StdRng,
    logger: Option<Logger>,
    history: History,
    step: usize,
}

impl TrainingSession {
    pub fn new(arch: VaeArchitecture, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let mut init_rng = rng_from_seed(config.seed, Stream::Init);
        let vae = Vae::new(arch, &mut init_rng)?;
        log::info!(
            "built VAE encoder {:?} decoder {:?} latent {} ({} parameters)",
            vae.arch.encoder_dims,
            vae.arch.decoder_dims,
            vae.arch.latent_dim,
            vae.param_count()
        );
        if config.diagrams {
            topology::emit_diagrams(&vae, &config.output_dir)?;
        }
        let logger = if config.log_dir.is_some() || config.experiment.is_some() {
            match Logger::new(config.log_dir.clone(), config.experiment.clone()) {
                Ok(l) => Some(l),
                Err(e) => {
                    log::warn!("metric logging disabled: {e}");
                    None
                }
            }
        } else {
            None
        };
        Ok(Self {
            optimizer: config.optimizer.build(config.learning_rate),
            schedule: KlAnnealing::new(config.cutoff),
            beta: 0.0,
            noise_rng: rng_from_seed(config.seed, Stream::Noise),
            shuffle_rng: rng_from_seed(config.seed, Stream::Shuffle),
            vae,
            config,
            logger,
            history: History::default(),
            step: 0,
        })
    }

    /// Change the annealing cutoff for subsequent calls to `fit`. The early
    /// stopping patience follows the cutoff.
    pub fn set_cutoff(&mut self, cutoff: usize) {
        self.config.cutoff = cutoff;
        self.schedule = KlAnnealing::new(cutoff);
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn steps(&self) -> usize {
        self.step
    }

    fn check_split(&self, m: &Matrix, split: &'static str) -> Result<()> {
        if m.is_empty() {
            return Err(VaeError::EmptySplit(split));
        }
        if m.cols != self.vae.arch.input_dim {
            return Err(VaeError::Shape {
                expected: format!("{} features", self.vae.arch.input_dim),
                actual: format!("{} features in the {split} split", m.cols),
            });
        }
        Ok(())
    }

    /// One optimizer step on `batch` with the current KL weight.
    pub fn train_step(&mut self, batch: &Matrix) -> Result<LossOutput> {
        self.vae.zero_grad();
        let out = self.vae.forward_train(batch, &mut self.noise_rng);
        let loss = vae_loss(batch, &out.recon, &out.mean, &out.log_var, self.beta)?;
        self.vae.backward(&loss.grads);
        self.optimizer.step(&mut self.vae.parameters());
        self.step += 1;
        Ok(loss)
    }

    /// Mean loss over `data` with the current KL weight, without updating
    /// any parameters.
    pub fn evaluate(&mut self, data: &Matrix) -> Result<EvalLoss> {
        self.check_split(data, "evaluation")?;
        let mut running = RunningLoss::default();
        for batch in DataLoader::new(data, self.config.batch_size) {
            let out = self.vae.forward(&batch, &mut self.noise_rng);
            let loss = vae_loss(&batch, &out.recon, &out.mean, &out.log_var, self.beta)?;
            running.add(&loss, batch.rows);
        }
        Ok(running.mean())
    }

    /// Train on `data.train`, validating on `data.val` after every epoch.
    ///
    /// Before the first step of epoch `e` the KL weight is set to
    /// `min(1, e / cutoff)`. Training stops after `epochs` epochs, when the
    /// validation loss has not improved for `200 * cutoff` epochs, when a
    /// callback asks to stop, or when the loss stops being finite.
    pub fn fit(&mut self, data: &Dataset, callbacks: &mut [&mut dyn Callback]) -> Result<History> {
        self.check_split(&data.train, "training")?;
        self.check_split(&data.val, "validation")?;

        let epochs = self.config.epochs;
        let lr = self.optimizer.learning_rate();
        let mut early = EarlyStopping::new(self.schedule.patience());
        early.on_train_begin();
        for cb in callbacks.iter_mut() {
            cb.on_train_begin();
        }

        log::info!("Initializing training...");
        math::reset_matrix_ops();
        let pb = ProgressBar::new(epochs as u64);
        let mut history = History::default();
        let mut loader = DataLoader::new(&data.train, self.config.batch_size);
        for epoch in 0..epochs {
            self.beta = self.schedule.beta_at(epoch);
            for cb in callbacks.iter_mut() {
                cb.on_epoch_begin(epoch, self.beta);
            }

            loader.reset(self.config.shuffle, &mut self.shuffle_rng);
            let mut running = RunningLoss::default();
            for batch in loader.by_ref() {
                let loss = self.train_step(&batch)?;
                running.add(&loss, batch.rows);
            }
            let train = running.mean();
            let val = self.evaluate(&data.val)?;
            history.push(train.total, val.total, self.beta);

            let record = MetricRecord {
                run: self.config.name.clone(),
                epoch,
                step: self.step,
                loss: train.total,
                val_loss: val.total,
                reconstruction: train.reconstruction,
                kl: train.kl,
                beta: self.beta,
                lr,
                kind: "epoch",
            };
            let msg = format_epoch(epoch, epochs, train.total, val.total, self.beta);
            log::info!("{msg}");
            pb.set_message(msg);
            pb.inc(1);
            if let Some(l) = &mut self.logger {
                l.log(&record);
            }

            if !train.total.is_finite() || !val.total.is_finite() {
                log::warn!("epoch {epoch}: non-finite loss, stopping training");
                break;
            }
            let mut stop = early.on_epoch_end(&record) == CallbackSignal::Stop;
            for cb in callbacks.iter_mut() {
                if cb.on_epoch_end(&record) == CallbackSignal::Stop {
                    stop = true;
                }
            }
            if stop {
                break;
            }
        }
        pb.finish_with_message("training done");
        for cb in callbacks.iter_mut() {
            cb.on_train_end();
        }
        log_total_ops(math::matrix_ops_count());

        self.history = history.clone();
        Ok(history)
    }

    /// Fit, optionally persist loss curves and weights, and return the last
    /// validation loss.
    pub fn train(&mut self, data: &Dataset, callbacks: &mut [&mut dyn Callback]) -> Result<f32> {
        let history = self.fit(data, callbacks)?;
        if self.config.save {
            self.save_artifacts()?;
        }
        history
            .last_val_loss()
            .ok_or(VaeError::EmptySplit("validation"))
    }

    /// File name of the weights written by [`TrainingSession::save_artifacts`].
    pub fn weights_file_name(&self) -> String {
        format!(
            "{}_{}e_{}b.json",
            self.config.name, self.config.epochs, self.config.batch_size
        )
    }

    /// Write the loss curves of the last `fit` and the current weights into
    /// the output directory.
    pub fn save_artifacts(&self) -> Result<()> {
        let dir = &self.config.output_dir;
        self.history.save(dir, &self.config.name)?;
        save_vae(dir.join(self.weights_file_name()), &self.vae)
    }
}
