use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::activation::Activation;
use crate::math::Matrix;

// Fully connected layer `y = act(x W + b)` with hand-written backward pass.
// During training the layer keeps the last input and the activated output so
// that `backward` can compute gradients for the weights, the bias and the
// layer input. Adam moment estimates live next to the parameters so that the
// optimizer state persists across steps without any external bookkeeping.

pub struct Dense {
    pub name: String,
    pub w: Matrix,
    pub b: Vec<f32>,
    pub activation: Activation,
    grad_w: Matrix,
    grad_b: Vec<f32>,
    m_w: Matrix,
    v_w: Matrix,
    m_b: Vec<f32>,
    v_b: Vec<f32>,
    t: usize,
    last_x: Matrix,
    last_out: Matrix,
}

impl Dense {
    /// Create a layer with Glorot-uniform weights and a zero bias.
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let w = Matrix::from_vec(
            in_dim,
            out_dim,
            (0..in_dim * out_dim).map(|_| dist.sample(&mut *rng)).collect(),
        );
        Self::from_parts(name, w, vec![0.0; out_dim], activation)
    }

    /// Build a layer from existing parameters, e.g. weights loaded from disk.
    pub fn from_parts(
        name: impl Into<String>,
        w: Matrix,
        b: Vec<f32>,
        activation: Activation,
    ) -> Self {
        assert_eq!(w.cols, b.len());
        let (rows, cols) = w.shape();
        Self {
            name: name.into(),
            grad_w: Matrix::zeros(rows, cols),
            grad_b: vec![0.0; cols],
            m_w: Matrix::zeros(rows, cols),
            v_w: Matrix::zeros(rows, cols),
            m_b: vec![0.0; cols],
            v_b: vec![0.0; cols],
            t: 0,
            last_x: Matrix::zeros(0, 0),
            last_out: Matrix::zeros(0, 0),
            w,
            b,
            activation,
        }
    }

    pub fn in_dim(&self) -> usize {
        self.w.rows
    }

    pub fn out_dim(&self) -> usize {
        self.w.cols
    }

    pub fn param_count(&self) -> usize {
        self.w.data.len() + self.b.len()
    }

    fn affine(&self, x: &Matrix) -> Matrix {
        let mut out = Matrix::matmul(x, &self.w);
        out.add_row_vector(&self.b);
        out
    }

    /// Inference forward pass; nothing is cached.
    pub fn forward(&self, x: &Matrix) -> Matrix {
        let mut out = self.affine(x);
        self.activation.forward_matrix(&mut out);
        out
    }

    /// Training forward pass storing the input and output for `backward`.
    pub fn forward_train(&mut self, x: &Matrix) -> Matrix {
        let out = self.forward(x);
        self.last_x = x.clone();
        self.last_out = out.clone();
        out
    }

    /// Backward pass for a gradient with respect to the activated output.
    /// Accumulates parameter gradients and returns the gradient with respect
    /// to the layer input.
    pub fn backward(&mut self, grad_out: &Matrix) -> Matrix {
        let mut grad = grad_out.clone();
        self.activation.backward(&mut grad, &self.last_out);
        self.backward_preactivation(&grad)
    }

    /// Backward pass for a gradient that is already taken with respect to the
    /// pre-activation output (used when a loss fuses the final activation).
    pub fn backward_preactivation(&mut self, grad_pre: &Matrix) -> Matrix {
        let grad_w = Matrix::matmul_tn(&self.last_x, grad_pre);
        for (g, d) in self.grad_w.data.iter_mut().zip(grad_w.data.iter()) {
            *g += d;
        }
        for (g, d) in self.grad_b.iter_mut().zip(grad_pre.sum_rows()) {
            *g += d;
        }
        Matrix::matmul_nt(grad_pre, &self.w)
    }

    pub fn zero_grad(&mut self) {
        self.grad_w.data.iter_mut().for_each(|g| *g = 0.0);
        self.grad_b.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn grad_w(&self) -> &Matrix {
        &self.grad_w
    }

    pub fn grad_b(&self) -> &[f32] {
        &self.grad_b
    }

    pub fn sgd_step(&mut self, lr: f32, weight_decay: f32) {
        for (w, g) in self.w.data.iter_mut().zip(self.grad_w.data.iter()) {
            *w -= lr * (g + weight_decay * *w);
        }
        for (b, g) in self.b.iter_mut().zip(self.grad_b.iter()) {
            *b -= lr * g;
        }
    }

    pub fn adam_step(&mut self, lr: f32, beta1: f32, beta2: f32, eps: f32, weight_decay: f32) {
        self.t += 1;
        let bc1 = 1.0 - beta1.powi(self.t as i32);
        let bc2 = 1.0 - beta2.powi(self.t as i32);
        for i in 0..self.w.data.len() {
            let g = self.grad_w.data[i] + weight_decay * self.w.data[i];
            self.m_w.data[i] = beta1 * self.m_w.data[i] + (1.0 - beta1) * g;
            self.v_w.data[i] = beta2 * self.v_w.data[i] + (1.0 - beta2) * g * g;
            let m_hat = self.m_w.data[i] / bc1;
            let v_hat = self.v_w.data[i] / bc2;
            self.w.data[i] -= lr * m_hat / (v_hat.sqrt() + eps);
        }
        for i in 0..self.b.len() {
            let g = self.grad_b[i];
            self.m_b[i] = beta1 * self.m_b[i] + (1.0 - beta1) * g;
            self.v_b[i] = beta2 * self.v_b[i] + (1.0 - beta2) * g * g;
            let m_hat = self.m_b[i] / bc1;
            let v_hat = self.v_b[i] / bc2;
            self.b[i] -= lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::fixed_rng;

    #[test]
    fn glorot_init_within_limit() {
        let mut rng = fixed_rng(7);
        let layer = Dense::new("d", 448, 64, Activation::Relu, &mut rng);
        let limit = (6.0f32 / 512.0).sqrt();
        assert!(layer.w.data.iter().all(|w| w.abs() <= limit));
        assert!(layer.b.iter().all(|&b| b == 0.0));
        assert_eq!(layer.param_count(), 448 * 64 + 64);
    }

    #[test]
    fn backward_accumulates_bias_gradient() {
        let w = Matrix::from_vec(2, 1, vec![1.0, -1.0]);
        let mut layer = Dense::from_parts("d", w, vec![0.5], Activation::Linear);
        let x = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let out = layer.forward_train(&x);
        assert_eq!(out.data, vec![-0.5, -0.5]);
        let grad_in = layer.backward(&Matrix::from_vec(2, 1, vec![1.0, 1.0]));
        assert_eq!(layer.grad_b(), &[2.0]);
        assert_eq!(layer.grad_w().data, vec![4.0, 6.0]);
        assert_eq!(grad_in.data, vec![1.0, -1.0, 1.0, -1.0]);
        layer.zero_grad();
        assert_eq!(layer.grad_b(), &[0.0]);
    }

    #[test]
    fn adam_moves_against_gradient() {
        let w = Matrix::from_vec(1, 1, vec![1.0]);
        let mut layer = Dense::from_parts("d", w, vec![0.0], Activation::Linear);
        let x = Matrix::from_vec(1, 1, vec![1.0]);
        layer.forward_train(&x);
        layer.backward(&Matrix::from_vec(1, 1, vec![2.0]));
        layer.adam_step(0.1, 0.9, 0.999, 1e-7, 0.0);
        assert!((layer.w.data[0] - 0.9).abs() < 1e-4);
        assert!((layer.b[0] + 0.1).abs() < 1e-4);
    }
}
