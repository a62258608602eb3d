use rand::Rng;

use crate::layers::{Activation, Dense};
use crate::math::Matrix;

/// A stack of dense layers applied one after another.
pub struct Sequential {
    /// Ordered list of layers.
    pub layers: Vec<Dense>,
}

impl Sequential {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Build a stack of `widths.len()` dense layers starting from `in_dim`.
    /// Layer `i` has `widths[i]` units and `activations[i]`; layers are
    /// named `<prefix>_<i>`.
    pub fn stack<R: Rng + ?Sized>(
        prefix: &str,
        in_dim: usize,
        widths: &[usize],
        activations: &[Activation],
        rng: &mut R,
    ) -> Self {
        let mut seq = Self::new();
        let mut prev = in_dim;
        for (i, (&width, &act)) in widths.iter().zip(activations).enumerate() {
            seq.add_layer(Dense::new(format!("{prefix}_{i}"), prev, width, act, rng));
            prev = width;
        }
        seq
    }

    /// Append a layer to the sequence.
    pub fn add_layer(&mut self, layer: Dense) {
        self.layers.push(layer);
    }

    /// Width of the last layer, or `None` for an empty stack.
    pub fn out_dim(&self) -> Option<usize> {
        self.layers.last().map(Dense::out_dim)
    }

    /// Forward pass used during inference.
    pub fn forward(&self, x: &Matrix) -> Matrix {
        let mut out = x.clone();
        for layer in &self.layers {
            out = layer.forward(&out);
        }
        out
    }

    /// Forward pass used during training.
    pub fn forward_train(&mut self, x: &Matrix) -> Matrix {
        let mut out = x.clone();
        for layer in self.layers.iter_mut() {
            out = layer.forward_train(&out);
        }
        out
    }

    /// Backward pass returning gradient with respect to the input.
    pub fn backward(&mut self, grad_out: &Matrix) -> Matrix {
        let mut grad = grad_out.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad);
        }
        grad
    }

    /// Zero any accumulated gradients in all layers.
    pub fn zero_grad(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.zero_grad();
        }
    }

    pub fn parameters(&mut self) -> Vec<&mut Dense> {
        self.layers.iter_mut().collect()
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}
