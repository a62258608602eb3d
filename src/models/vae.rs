use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::sequential::Sequential;
use crate::error::{Result, VaeError};
use crate::layers::{Activation, Dense};
use crate::loss::LossGrads;
use crate::math::Matrix;

/// Length of a flattened 14x32 piano-roll feature vector.
pub const FEATURE_DIM: usize = 14 * 32;

/// Layer widths and activations for the encoder and decoder stacks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VaeArchitecture {
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,
    pub encoder_dims: Vec<usize>,
    pub encoder_activations: Vec<Activation>,
    pub decoder_dims: Vec<usize>,
    pub decoder_activations: Vec<Activation>,
    pub latent_dim: usize,
}

fn default_input_dim() -> usize {
    FEATURE_DIM
}

impl VaeArchitecture {
    /// Architecture with the same activation on every hidden layer.
    pub fn uniform(
        encoder_dims: Vec<usize>,
        decoder_dims: Vec<usize>,
        latent_dim: usize,
        activation: Activation,
    ) -> Self {
        Self {
            input_dim: FEATURE_DIM,
            encoder_activations: vec![activation; encoder_dims.len()],
            decoder_activations: vec![activation; decoder_dims.len()],
            encoder_dims,
            decoder_dims,
            latent_dim,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 || self.latent_dim == 0 {
            return Err(VaeError::Config(
                "input_dim and latent_dim must be positive".into(),
            ));
        }
        if self.encoder_dims.len() != self.encoder_activations.len() {
            return Err(VaeError::Config(format!(
                "{} encoder widths but {} encoder activations",
                self.encoder_dims.len(),
                self.encoder_activations.len()
            )));
        }
        if self.decoder_dims.len() != self.decoder_activations.len() {
            return Err(VaeError::Config(format!(
                "{} decoder widths but {} decoder activations",
                self.decoder_dims.len(),
                self.decoder_activations.len()
            )));
        }
        if self.encoder_dims.iter().chain(&self.decoder_dims).any(|&d| d == 0) {
            return Err(VaeError::Config("layer widths must be positive".into()));
        }
        Ok(())
    }
}

/// Draw `eps ~ N(0, 1)` with the shape of `mean` and return
/// `(mean + exp(0.5 * log_var) * eps, eps)`.
pub fn reparameterize<R: Rng + ?Sized>(
    mean: &Matrix,
    log_var: &Matrix,
    rng: &mut R,
) -> (Matrix, Matrix) {
    let eps = Matrix::from_vec(
        mean.rows,
        mean.cols,
        (0..mean.data.len())
            .map(|_| StandardNormal.sample(&mut *rng))
            .collect(),
    );
    (reparameterize_with_noise(mean, log_var, &eps), eps)
}

/// Deterministic reparameterization with caller supplied noise.
pub fn reparameterize_with_noise(mean: &Matrix, log_var: &Matrix, eps: &Matrix) -> Matrix {
    assert_eq!(mean.shape(), log_var.shape());
    assert_eq!(mean.shape(), eps.shape());
    let data = mean
        .data
        .iter()
        .zip(log_var.data.iter())
        .zip(eps.data.iter())
        .map(|((&m, &lv), &e)| m + (0.5 * lv).exp() * e)
        .collect();
    Matrix::from_vec(mean.rows, mean.cols, data)
}

/// Hidden stack followed by linear mean and log-variance heads.
pub struct Encoder {
    pub hidden: Sequential,
    pub z_mean: Dense,
    pub z_log_var: Dense,
}

impl Encoder {
    pub fn new<R: Rng + ?Sized>(arch: &VaeArchitecture, rng: &mut R) -> Self {
        let hidden = Sequential::stack(
            "encoder_dense",
            arch.input_dim,
            &arch.encoder_dims,
            &arch.encoder_activations,
            rng,
        );
        let h = hidden.out_dim().unwrap_or(arch.input_dim);
        Self {
            hidden,
            z_mean: Dense::new("z_mean", h, arch.latent_dim, Activation::Linear, rng),
            z_log_var: Dense::new("z_log_var", h, arch.latent_dim, Activation::Linear, rng),
        }
    }

    pub fn encode(&self, x: &Matrix) -> (Matrix, Matrix) {
        let h = self.hidden.forward(x);
        (self.z_mean.forward(&h), self.z_log_var.forward(&h))
    }

    pub fn forward_train(&mut self, x: &Matrix) -> (Matrix, Matrix) {
        let h = self.hidden.forward_train(x);
        (self.z_mean.forward_train(&h), self.z_log_var.forward_train(&h))
    }

    pub fn backward(&mut self, grad_mean: &Matrix, grad_log_var: &Matrix) -> Matrix {
        let g_mean = self.z_mean.backward(grad_mean);
        let g_log_var = self.z_log_var.backward(grad_log_var);
        self.hidden.backward(&g_mean.add(&g_log_var))
    }

    pub fn parameters(&mut self) -> Vec<&mut Dense> {
        let mut params = self.hidden.parameters();
        params.push(&mut self.z_mean);
        params.push(&mut self.z_log_var);
        params
    }
}

/// Hidden stack followed by a sigmoid reconstruction head.
pub struct Decoder {
    pub hidden: Sequential,
    pub output: Dense,
}

impl Decoder {
    pub fn new<R: Rng + ?Sized>(arch: &VaeArchitecture, rng: &mut R) -> Self {
        let hidden = Sequential::stack(
            "decoder_dense",
            arch.latent_dim,
            &arch.decoder_dims,
            &arch.decoder_activations,
            rng,
        );
        let h = hidden.out_dim().unwrap_or(arch.latent_dim);
        Self {
            hidden,
            output: Dense::new("decoder_output", h, arch.input_dim, Activation::Sigmoid, rng),
        }
    }

    pub fn decode(&self, z: &Matrix) -> Matrix {
        self.output.forward(&self.hidden.forward(z))
    }

    pub fn forward_train(&mut self, z: &Matrix) -> Matrix {
        let h = self.hidden.forward_train(z);
        self.output.forward_train(&h)
    }

    /// Backward pass from the gradient on the pre-sigmoid output.
    pub fn backward(&mut self, grad_logits: &Matrix) -> Matrix {
        let g = self.output.backward_preactivation(grad_logits);
        self.hidden.backward(&g)
    }

    pub fn parameters(&mut self) -> Vec<&mut Dense> {
        let mut params = self.hidden.parameters();
        params.push(&mut self.output);
        params
    }
}

/// Outputs of a full encoder -> sample -> decoder pass.
#[derive(Clone, Debug)]
pub struct VaeOutput {
    pub recon: Matrix,
    pub mean: Matrix,
    pub log_var: Matrix,
    pub z: Matrix,
}

pub struct Vae {
    pub arch: VaeArchitecture,
    pub encoder: Encoder,
    pub decoder: Decoder,
    // caches for backward
    log_var: Matrix,
    eps: Matrix,
}

impl Vae {
    pub fn new<R: Rng + ?Sized>(arch: VaeArchitecture, rng: &mut R) -> Result<Self> {
        arch.validate()?;
        let encoder = Encoder::new(&arch, rng);
        let decoder = Decoder::new(&arch, rng);
        Ok(Self::from_parts(arch, encoder, decoder))
    }

    pub fn from_parts(arch: VaeArchitecture, encoder: Encoder, decoder: Decoder) -> Self {
        Self {
            arch,
            encoder,
            decoder,
            log_var: Matrix::zeros(0, 0),
            eps: Matrix::zeros(0, 0),
        }
    }

    pub fn latent_dim(&self) -> usize {
        self.arch.latent_dim
    }

    pub fn encode(&self, x: &Matrix) -> (Matrix, Matrix) {
        self.encoder.encode(x)
    }

    pub fn decode(&self, z: &Matrix) -> Matrix {
        self.decoder.decode(z)
    }

    /// Inference pass. The latent code is sampled, as in training, so the
    /// reported loss is the same stochastic objective the model optimises.
    pub fn forward<R: Rng + ?Sized>(&self, x: &Matrix, rng: &mut R) -> VaeOutput {
        let (mean, log_var) = self.encode(x);
        let (z, _) = reparameterize(&mean, &log_var, rng);
        let recon = self.decode(&z);
        VaeOutput {
            recon,
            mean,
            log_var,
            z,
        }
    }

    pub fn forward_train<R: Rng + ?Sized>(&mut self, x: &Matrix, rng: &mut R) -> VaeOutput {
        let (mean, log_var) = self.encoder.forward_train(x);
        let (z, eps) = reparameterize(&mean, &log_var, rng);
        self.finish_forward_train(mean, log_var, z, eps)
    }

    /// Training pass with fixed latent noise, for reproducible gradients.
    pub fn forward_train_with_noise(&mut self, x: &Matrix, eps: &Matrix) -> VaeOutput {
        let (mean, log_var) = self.encoder.forward_train(x);
        let z = reparameterize_with_noise(&mean, &log_var, eps);
        self.finish_forward_train(mean, log_var, z, eps.clone())
    }

    fn finish_forward_train(
        &mut self,
        mean: Matrix,
        log_var: Matrix,
        z: Matrix,
        eps: Matrix,
    ) -> VaeOutput {
        let recon = self.decoder.forward_train(&z);
        self.log_var = log_var.clone();
        self.eps = eps;
        VaeOutput {
            recon,
            mean,
            log_var,
            z,
        }
    }

    /// Backpropagate loss gradients through decoder, sampling step and
    /// encoder. Must follow `forward_train` on the same batch.
    pub fn backward(&mut self, grads: &LossGrads) {
        let grad_z = self.decoder.backward(&grads.logits);

        // dz/dmean = 1, dz/dlog_var = 0.5 * exp(0.5 * log_var) * eps
        let grad_mean = grad_z.add(&grads.mean);
        let mut grad_log_var = grads.log_var.clone();
        for i in 0..grad_log_var.data.len() {
            let std = (0.5 * self.log_var.data[i]).exp();
            grad_log_var.data[i] += grad_z.data[i] * 0.5 * std * self.eps.data[i];
        }
        self.encoder.backward(&grad_mean, &grad_log_var);
    }

    pub fn zero_grad(&mut self) {
        for p in self.parameters() {
            p.zero_grad();
        }
    }

    pub fn parameters(&mut self) -> Vec<&mut Dense> {
        let mut params = self.encoder.parameters();
        params.extend(self.decoder.parameters());
        params
    }

    pub fn param_count(&self) -> usize {
        let enc = &self.encoder;
        let dec = &self.decoder;
        enc.hidden.layers.iter().map(Dense::param_count).sum::<usize>()
            + enc.z_mean.param_count()
            + enc.z_log_var.param_count()
            + dec.hidden.layers.iter().map(Dense::param_count).sum::<usize>()
            + dec.output.param_count()
    }
}
