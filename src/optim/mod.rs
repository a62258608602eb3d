pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::SGD;

use serde::Deserialize;

use crate::layers::Dense;

/// Common interface for optimizers operating on dense layers.
pub trait Optimizer {
    /// Update the provided parameters in-place from their accumulated
    /// gradients.
    fn step(&mut self, params: &mut [&mut Dense]);

    fn learning_rate(&self) -> f32;
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Dense]) {
        Adam::step(self, params);
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Dense]) {
        SGD::step(self, params);
    }

    fn learning_rate(&self) -> f32 {
        self.lr
    }
}

/// Optimizer selection in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn build(self, lr: f32) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Adam => Box::new(Adam::with_lr(lr)),
            OptimizerKind::Sgd => Box::new(SGD::new(lr, 0.0)),
        }
    }
}
