use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// Per-epoch loss curves of one training run. Both sequences have one entry
/// per epoch that actually ran.
#[derive(Clone, Debug, Default, Serialize)]
pub struct History {
    pub train_loss: Vec<f32>,
    pub val_loss: Vec<f32>,
    pub beta: Vec<f32>,
}

impl History {
    pub fn push(&mut self, train_loss: f32, val_loss: f32, beta: f32) {
        self.train_loss.push(train_loss);
        self.val_loss.push(val_loss);
        self.beta.push(beta);
    }

    pub fn epochs_run(&self) -> usize {
        self.val_loss.len()
    }

    pub fn last_val_loss(&self) -> Option<f32> {
        self.val_loss.last().copied()
    }

    pub fn best_val_loss(&self) -> Option<(usize, f32)> {
        self.val_loss
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Write `train_loss_<name>.txt` and `val_loss_<name>.txt` into `dir`,
    /// one value per line. Returns both paths.
    pub fn save(&self, dir: impl AsRef<Path>, name: &str) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let train_path = dir.join(format!("train_loss_{name}.txt"));
        let val_path = dir.join(format!("val_loss_{name}.txt"));
        write_column(&train_path, &self.train_loss)?;
        write_column(&val_path, &self.val_loss)?;
        log::info!(
            "saved loss curves to {} and {}",
            train_path.display(),
            val_path.display()
        );
        Ok((train_path, val_path))
    }
}

/// Format like numpy's default `%.18e`, e.g. `3.800000011920928955e-01`.
pub fn format_sci(v: f32) -> String {
    let v = v as f64;
    if !v.is_finite() {
        return if v.is_nan() {
            "nan".to_string()
        } else if v > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    let s = format!("{:.18e}", v);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => s,
    }
}

fn write_column(path: &Path, values: &[f32]) -> Result<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    for &v in values {
        writeln!(w, "{}", format_sci(v))?;
    }
    w.flush()?;
    Ok(())
}

/// Read back a file written by [`History::save`].
pub fn read_column(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let text = fs::read_to_string(path.as_ref())?;
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<f64>().map(|v| v as f32).map_err(|e| {
                crate::error::VaeError::Config(format!(
                    "{}: bad value '{l}': {e}",
                    path.as_ref().display()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numpy_style_exponent() {
        assert_eq!(format_sci(0.5), "5.000000000000000000e-01");
        assert_eq!(format_sci(123.0), "1.230000000000000000e+02");
        assert_eq!(format_sci(0.0), "0.000000000000000000e+00");
    }

    #[test]
    fn best_val_loss_skips_nan() {
        let mut h = History::default();
        h.push(1.0, 0.9, 0.0);
        h.push(1.0, f32::NAN, 0.5);
        h.push(1.0, 0.4, 1.0);
        assert_eq!(h.best_val_loss(), Some((2, 0.4)));
        assert!(h.last_val_loss().unwrap() == 0.4);
    }
}
