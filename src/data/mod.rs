pub mod dataloader;
pub mod npy;

pub use dataloader::DataLoader;
pub use npy::{read_npy, write_npy, NpyArray};

use std::path::Path;

use crate::error::{Result, VaeError};
use crate::math::Matrix;

/// Number of shards concatenated into the training split.
pub const TRAIN_SHARDS: usize = 6;
/// Index of the shard that is halved into test and validation data.
pub const HOLDOUT_SHARD: usize = 6;

/// File name of shard `idx`.
pub fn shard_name(idx: usize) -> String {
    format!("data_matrix{idx}.npy")
}

/// Train/validation/test splits, one flattened feature vector per row.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub train: Matrix,
    pub val: Matrix,
    pub test: Matrix,
}

impl Dataset {
    /// Build the splits from in-memory shards: training data is the
    /// concatenation of `train_parts`; the first half of `holdout` becomes
    /// the test split and the remainder the validation split.
    pub fn from_parts(train_parts: &[Matrix], holdout: Matrix) -> Result<Self> {
        let train = Matrix::vstack(train_parts).ok_or_else(|| VaeError::Shape {
            expected: "training shards with equal feature width".into(),
            actual: format!(
                "widths {:?}",
                train_parts.iter().map(|m| m.cols).collect::<Vec<_>>()
            ),
        })?;
        if holdout.cols != train.cols {
            return Err(VaeError::Shape {
                expected: format!("{} features in the holdout shard", train.cols),
                actual: format!("{}", holdout.cols),
            });
        }
        let half = holdout.rows / 2;
        let test = holdout.slice_rows(0, half);
        let val = holdout.slice_rows(half, holdout.rows);
        Ok(Self { train, val, test })
    }

    /// Load `data_matrix0.npy` .. `data_matrix6.npy` from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut train_parts = Vec::with_capacity(TRAIN_SHARDS);
        for idx in 0..TRAIN_SHARDS {
            let path = dir.join(shard_name(idx));
            let m = read_npy(&path)?.into_matrix();
            log::debug!("loaded {} with {} samples", path.display(), m.rows);
            train_parts.push(m);
        }
        let holdout = read_npy(dir.join(shard_name(HOLDOUT_SHARD)))?.into_matrix();
        let ds = Self::from_parts(&train_parts, holdout)?;
        log::info!(
            "dataset: {} train / {} val / {} test samples of {} features",
            ds.train.rows,
            ds.val.rows,
            ds.test.rows,
            ds.feature_dim()
        );
        Ok(ds)
    }

    pub fn feature_dim(&self) -> usize {
        self.train.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holdout_is_split_test_first() {
        let train = vec![Matrix::zeros(2, 3), Matrix::zeros(1, 3)];
        let holdout = Matrix::from_vec(5, 3, (0..15).map(|v| v as f32).collect());
        let ds = Dataset::from_parts(&train, holdout).unwrap();
        assert_eq!(ds.train.rows, 3);
        assert_eq!(ds.test.rows, 2);
        assert_eq!(ds.val.rows, 3);
        assert_eq!(ds.test.row(0), &[0.0, 1.0, 2.0]);
        assert_eq!(ds.val.row(0), &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let train = vec![Matrix::zeros(2, 3)];
        assert!(Dataset::from_parts(&train, Matrix::zeros(2, 4)).is_err());
    }
}
