use crate::error::{Result, VaeError};
use crate::layers::{Activation, Dense};
use crate::math::Matrix;
use crate::models::{Decoder, Encoder, Sequential, Vae, VaeArchitecture};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Serialize, Deserialize)]
pub struct DenseJson {
    pub name: String,
    pub activation: Activation,
    pub w: Vec<Vec<f32>>,
    pub b: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
pub struct VaeJson {
    pub architecture: VaeArchitecture,
    pub encoder: Vec<DenseJson>,
    pub z_mean: DenseJson,
    pub z_log_var: DenseJson,
    pub decoder: Vec<DenseJson>,
    pub decoder_output: DenseJson,
}

/// Convert a [`Matrix`] into a 2-D `Vec` for serialisation.
pub fn matrix_to_vec2(m: &Matrix) -> Vec<Vec<f32>> {
    (0..m.rows).map(|r| m.row(r).to_vec()).collect()
}

/// Convert a 2-D `Vec` into a [`Matrix`]. Ragged input is rejected.
pub fn vec2_to_matrix(rows: &[Vec<f32>]) -> Result<Matrix> {
    let c = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != c) {
        return Err(VaeError::Shape {
            expected: format!("rows of length {c}"),
            actual: "ragged weight matrix".into(),
        });
    }
    Ok(Matrix::from_vec(
        rows.len(),
        c,
        rows.iter().flatten().copied().collect(),
    ))
}

fn dense_to_json(d: &Dense) -> DenseJson {
    DenseJson {
        name: d.name.clone(),
        activation: d.activation,
        w: matrix_to_vec2(&d.w),
        b: d.b.clone(),
    }
}

fn dense_from_json(j: &DenseJson, in_dim: usize, out_dim: usize) -> Result<Dense> {
    let w = vec2_to_matrix(&j.w)?;
    if w.shape() != (in_dim, out_dim) || j.b.len() != out_dim {
        return Err(VaeError::Shape {
            expected: format!("{}: {in_dim}x{out_dim}", j.name),
            actual: format!("{}x{} with {} biases", w.rows, w.cols, j.b.len()),
        });
    }
    Ok(Dense::from_parts(j.name.clone(), w, j.b.clone(), j.activation))
}

fn stack_from_json(layers: &[DenseJson], in_dim: usize, widths: &[usize]) -> Result<Sequential> {
    if layers.len() != widths.len() {
        return Err(VaeError::Shape {
            expected: format!("{} hidden layers", widths.len()),
            actual: format!("{}", layers.len()),
        });
    }
    let mut seq = Sequential::new();
    let mut prev = in_dim;
    for (j, &width) in layers.iter().zip(widths) {
        seq.add_layer(dense_from_json(j, prev, width)?);
        prev = width;
    }
    Ok(seq)
}

/// Persist the architecture and all layer parameters as JSON.
pub fn save_vae(path: impl AsRef<Path>, vae: &Vae) -> Result<()> {
    let path = path.as_ref();
    let model = VaeJson {
        architecture: vae.arch.clone(),
        encoder: vae.encoder.hidden.layers.iter().map(dense_to_json).collect(),
        z_mean: dense_to_json(&vae.encoder.z_mean),
        z_log_var: dense_to_json(&vae.encoder.z_log_var),
        decoder: vae.decoder.hidden.layers.iter().map(dense_to_json).collect(),
        decoder_output: dense_to_json(&vae.decoder.output),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(&model)?)?;
    log::info!("Saved VAE weights to {}", path.display());
    Ok(())
}

/// Rebuild a [`Vae`] from a file written by [`save_vae`].
pub fn load_vae(path: impl AsRef<Path>) -> Result<Vae> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)?;
    let model: VaeJson = serde_json::from_str(&txt)?;
    let arch = model.architecture;
    arch.validate()?;

    let enc_hidden = stack_from_json(&model.encoder, arch.input_dim, &arch.encoder_dims)?;
    let h = enc_hidden.out_dim().unwrap_or(arch.input_dim);
    let encoder = Encoder {
        hidden: enc_hidden,
        z_mean: dense_from_json(&model.z_mean, h, arch.latent_dim)?,
        z_log_var: dense_from_json(&model.z_log_var, h, arch.latent_dim)?,
    };

    let dec_hidden = stack_from_json(&model.decoder, arch.latent_dim, &arch.decoder_dims)?;
    let h = dec_hidden.out_dim().unwrap_or(arch.latent_dim);
    let decoder = Decoder {
        hidden: dec_hidden,
        output: dense_from_json(&model.decoder_output, h, arch.input_dim)?,
    };
    log::info!("Loaded VAE weights from {}", path.display());
    Ok(Vae::from_parts(arch, encoder, decoder))
}
