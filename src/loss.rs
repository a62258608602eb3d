//! VAE objective: binary cross-entropy reconstruction plus a beta-weighted
//! analytic KL divergence to the standard normal prior.
//!
//! For a batch of `N` rows the loss is
//!
//! ```text
//! mean_i( BCE_sum_i + (-0.5 * beta) * sum_k(1 + log_var - mean^2 - exp(log_var)) )
//! ```
//!
//! where `BCE_sum_i` is the per-feature binary cross-entropy summed over the
//! `D` input features (the per-feature mean scaled by `D`).

use crate::error::{Result, VaeError};
use crate::math::Matrix;

/// Predictions are clipped into `[EPSILON, 1 - EPSILON]` before taking logs.
pub const EPSILON: f32 = 1e-7;

/// Gradients of the batch loss with respect to the network outputs.
#[derive(Clone, Debug)]
pub struct LossGrads {
    /// Gradient with respect to the decoder's pre-sigmoid output. Fusing the
    /// sigmoid into the cross-entropy keeps this term finite even when the
    /// reconstruction saturates.
    pub logits: Matrix,
    pub mean: Matrix,
    pub log_var: Matrix,
}

#[derive(Clone, Debug)]
pub struct LossOutput {
    /// Batch-averaged total loss.
    pub total: f32,
    /// Batch-averaged reconstruction term.
    pub reconstruction: f32,
    /// Batch-averaged KL term, already multiplied by beta.
    pub kl: f32,
    pub grads: LossGrads,
}

fn check_same_shape(expected: &Matrix, actual: &Matrix) -> Result<()> {
    if expected.shape() != actual.shape() {
        return Err(VaeError::Shape {
            expected: format!("{:?}", expected.shape()),
            actual: format!("{:?}", actual.shape()),
        });
    }
    Ok(())
}

/// Per-row binary cross-entropy summed over features.
pub fn reconstruction_loss(x: &Matrix, recon: &Matrix) -> Vec<f32> {
    (0..x.rows)
        .map(|r| {
            x.row(r)
                .iter()
                .zip(recon.row(r))
                .map(|(&t, &p)| {
                    let p = p.clamp(EPSILON, 1.0 - EPSILON);
                    -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
                })
                .sum()
        })
        .collect()
}

/// Per-row `KL(N(mean, exp(log_var)) || N(0, 1))`, before beta weighting.
pub fn kl_divergence(mean: &Matrix, log_var: &Matrix) -> Vec<f32> {
    (0..mean.rows)
        .map(|r| {
            let s: f32 = mean
                .row(r)
                .iter()
                .zip(log_var.row(r))
                .map(|(&m, &lv)| 1.0 + lv - m * m - lv.exp())
                .sum();
            -0.5 * s
        })
        .collect()
}

/// Evaluate the VAE loss for one batch together with its gradients.
pub fn vae_loss(
    x: &Matrix,
    recon: &Matrix,
    mean: &Matrix,
    log_var: &Matrix,
    beta: f32,
) -> Result<LossOutput> {
    check_same_shape(x, recon)?;
    check_same_shape(mean, log_var)?;
    if x.rows != mean.rows {
        return Err(VaeError::Shape {
            expected: format!("{} latent rows", x.rows),
            actual: format!("{} latent rows", mean.rows),
        });
    }
    if x.rows == 0 {
        return Err(VaeError::EmptySplit("batch"));
    }

    let n = x.rows as f32;
    let reconstruction = reconstruction_loss(x, recon).iter().sum::<f32>() / n;
    let kl = beta * kl_divergence(mean, log_var).iter().sum::<f32>() / n;

    let logits = Matrix::from_vec(
        x.rows,
        x.cols,
        recon
            .data
            .iter()
            .zip(x.data.iter())
            .map(|(&p, &t)| (p - t) / n)
            .collect(),
    );
    let grad_mean = Matrix::from_vec(
        mean.rows,
        mean.cols,
        mean.data.iter().map(|&m| beta * m / n).collect(),
    );
    let grad_log_var = Matrix::from_vec(
        log_var.rows,
        log_var.cols,
        log_var
            .data
            .iter()
            .map(|&lv| 0.5 * beta * (lv.exp() - 1.0) / n)
            .collect(),
    );

    Ok(LossOutput {
        total: reconstruction + kl,
        reconstruction,
        kl,
        grads: LossGrads {
            logits,
            mean: grad_mean,
            log_var: grad_log_var,
        },
    })
}
