use rand::seq::SliceRandom;
use rand::Rng;

use crate::math::Matrix;

/// Mini-batch iterator over the rows of a matrix with optional shuffling.
///
/// The final batch may be smaller than `batch_size`.
pub struct DataLoader<'a> {
    data: &'a Matrix,
    order: Vec<usize>,
    batch_size: usize,
    index: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(data: &'a Matrix, batch_size: usize) -> Self {
        Self {
            data,
            order: (0..data.rows).collect(),
            batch_size: batch_size.max(1),
            index: 0,
        }
    }

    /// Rewind to the first batch, permuting the sample order when `shuffle`
    /// is set.
    pub fn reset<R: Rng + ?Sized>(&mut self, shuffle: bool, rng: &mut R) {
        self.index = 0;
        if shuffle {
            self.order.shuffle(rng);
        }
    }

    pub fn num_batches(&self) -> usize {
        (self.data.rows + self.batch_size - 1) / self.batch_size
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Matrix;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.order.len() {
            return None;
        }
        let end = (self.index + self.batch_size).min(self.order.len());
        let batch = self.data.select_rows(&self.order[self.index..end]);
        self.index = end;
        Some(batch)
    }
}
