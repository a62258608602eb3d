use std::sync::atomic::{AtomicUsize, Ordering};

static MATRIX_OPS: AtomicUsize = AtomicUsize::new(0);

pub fn reset_matrix_ops() {
    MATRIX_OPS.store(0, Ordering::SeqCst);
}

pub fn matrix_ops_count() -> usize {
    MATRIX_OPS.load(Ordering::SeqCst)
}

pub(crate) fn inc_ops() {
    MATRIX_OPS.fetch_add(1, Ordering::SeqCst);
}

/// Dense row-major matrix. Samples are stored one per row.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(r: usize, c: usize) -> Self {
        Matrix {
            rows: r,
            cols: c,
            data: vec![0.0; r * c],
        }
    }

    pub fn from_vec(r: usize, c: usize, v: Vec<f32>) -> Self {
        assert_eq!(v.len(), r * c);
        Matrix {
            rows: r,
            cols: c,
            data: v,
        }
    }

    pub fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: f32) {
        self.data[r * self.cols + c] = v;
    }

    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
        inc_ops();
        assert_eq!(a.cols, b.rows);
        let mut out = vec![0.0; a.rows * b.cols];
        for i in 0..a.rows {
            let a_row = &a.data[i * a.cols..(i + 1) * a.cols];
            for k in 0..a.cols {
                let a_val = a_row[k];
                if a_val == 0.0 {
                    continue;
                }
                let b_row = &b.data[k * b.cols..(k + 1) * b.cols];
                let out_row = &mut out[i * b.cols..(i + 1) * b.cols];
                for j in 0..b.cols {
                    out_row[j] += a_val * b_row[j];
                }
            }
        }
        Matrix::from_vec(a.rows, b.cols, out)
    }

    /// `a^T * b` without materialising the transpose.
    pub fn matmul_tn(a: &Matrix, b: &Matrix) -> Matrix {
        inc_ops();
        assert_eq!(a.rows, b.rows);
        let mut out = vec![0.0; a.cols * b.cols];
        for r in 0..a.rows {
            let a_row = a.row(r);
            let b_row = b.row(r);
            for (i, &a_val) in a_row.iter().enumerate() {
                if a_val == 0.0 {
                    continue;
                }
                let out_row = &mut out[i * b.cols..(i + 1) * b.cols];
                for j in 0..b.cols {
                    out_row[j] += a_val * b_row[j];
                }
            }
        }
        Matrix::from_vec(a.cols, b.cols, out)
    }

    /// `a * b^T` without materialising the transpose.
    pub fn matmul_nt(a: &Matrix, b: &Matrix) -> Matrix {
        inc_ops();
        assert_eq!(a.cols, b.cols);
        let mut out = vec![0.0; a.rows * b.rows];
        for i in 0..a.rows {
            let a_row = a.row(i);
            for j in 0..b.rows {
                let b_row = b.row(j);
                out[i * b.rows + j] = a_row.iter().zip(b_row).map(|(x, y)| x * y).sum();
            }
        }
        Matrix::from_vec(a.rows, b.rows, out)
    }

    pub fn add(&self, other: &Matrix) -> Matrix {
        inc_ops();
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a + b)
            .collect();
        Matrix::from_vec(self.rows, self.cols, data)
    }

    /// Add `bias` to every row in place.
    pub fn add_row_vector(&mut self, bias: &[f32]) {
        assert_eq!(self.cols, bias.len());
        for row in self.data.chunks_mut(self.cols) {
            for (v, b) in row.iter_mut().zip(bias) {
                *v += b;
            }
        }
    }

    /// Column sums, i.e. the gradient of a broadcast row bias.
    pub fn sum_rows(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.cols];
        for row in self.data.chunks(self.cols.max(1)) {
            for (o, v) in out.iter_mut().zip(row) {
                *o += v;
            }
        }
        out
    }

    pub fn transpose(&self) -> Matrix {
        inc_ops();
        let mut v = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                v[j * self.rows + i] = self.get(i, j);
            }
        }
        Matrix::from_vec(self.cols, self.rows, v)
    }

    /// Gather the given rows into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Matrix::from_vec(indices.len(), self.cols, data)
    }

    /// Contiguous rows `start..end`.
    pub fn slice_rows(&self, start: usize, end: usize) -> Matrix {
        let end = end.min(self.rows);
        let start = start.min(end);
        Matrix::from_vec(
            end - start,
            self.cols,
            self.data[start * self.cols..end * self.cols].to_vec(),
        )
    }

    /// Stack matrices with equal column counts on top of each other.
    pub fn vstack(parts: &[Matrix]) -> Option<Matrix> {
        let cols = parts.first()?.cols;
        if parts.iter().any(|p| p.cols != cols) {
            return None;
        }
        let rows = parts.iter().map(|p| p.rows).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for p in parts {
            data.extend_from_slice(&p.data);
        }
        Some(Matrix::from_vec(rows, cols, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_products_match_explicit_transpose() {
        let a = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Matrix::from_vec(2, 2, vec![1.0, -1.0, 0.5, 2.0]);
        let tn = Matrix::matmul_tn(&a, &b);
        let explicit = Matrix::matmul(&a.transpose(), &b);
        assert_eq!(tn, explicit);

        let c = Matrix::from_vec(4, 3, (0..12).map(|v| v as f32).collect());
        let nt = Matrix::matmul_nt(&a, &c);
        let explicit = Matrix::matmul(&a, &c.transpose());
        assert_eq!(nt, explicit);
    }

    #[test]
    fn bias_helpers() {
        let mut m = Matrix::zeros(3, 2);
        m.add_row_vector(&[1.0, 2.0]);
        assert_eq!(m.sum_rows(), vec![3.0, 6.0]);
    }

    #[test]
    fn vstack_and_slices() {
        let a = Matrix::from_vec(1, 2, vec![1.0, 2.0]);
        let b = Matrix::from_vec(2, 2, vec![3.0, 4.0, 5.0, 6.0]);
        let s = Matrix::vstack(&[a, b]).unwrap();
        assert_eq!(s.rows, 3);
        assert_eq!(s.slice_rows(1, 3).data, vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(s.select_rows(&[2, 0]).data, vec![5.0, 6.0, 1.0, 2.0]);
        assert!(Matrix::vstack(&[Matrix::zeros(1, 3), Matrix::zeros(1, 2)]).is_none());
    }
}
