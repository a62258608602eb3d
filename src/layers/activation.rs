use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VaeError;
use crate::math::Matrix;

const LEAKY_SLOPE: f32 = 0.01;

/// Element-wise activation applied after a dense layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    LeakyRelu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }

    /// Apply the activation in place.
    pub fn forward_matrix(&self, m: &mut Matrix) {
        match self {
            Activation::Linear => {}
            Activation::Relu => {
                for v in m.data.iter_mut() {
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
            Activation::LeakyRelu => {
                for v in m.data.iter_mut() {
                    if *v < 0.0 {
                        *v *= LEAKY_SLOPE;
                    }
                }
            }
            Activation::Sigmoid => {
                for v in m.data.iter_mut() {
                    *v = sigmoid(*v);
                }
            }
            Activation::Tanh => {
                for v in m.data.iter_mut() {
                    *v = v.tanh();
                }
            }
        }
    }

    /// Multiply `grad` by the derivative of the activation, expressed in
    /// terms of the activated outputs cached during the forward pass.
    pub fn backward(&self, grad: &mut Matrix, activated: &Matrix) {
        let pairs = grad.data.iter_mut().zip(activated.data.iter());
        match self {
            Activation::Linear => {}
            Activation::Relu => {
                for (g, &h) in pairs {
                    if h <= 0.0 {
                        *g = 0.0;
                    }
                }
            }
            Activation::LeakyRelu => {
                for (g, &h) in pairs {
                    if h < 0.0 {
                        *g *= LEAKY_SLOPE;
                    }
                }
            }
            Activation::Sigmoid => {
                for (g, &h) in pairs {
                    *g *= h * (1.0 - h);
                }
            }
            Activation::Tanh => {
                for (g, &h) in pairs {
                    *g *= 1.0 - h * h;
                }
            }
        }
    }
}

pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl FromStr for Activation {
    type Err = VaeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "identity" | "none" => Ok(Activation::Linear),
            "relu" => Ok(Activation::Relu),
            "leaky_relu" | "leakyrelu" => Ok(Activation::LeakyRelu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            other => Err(VaeError::Activation(other.to_string())),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keras_style_names() {
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("Sigmoid".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert!(matches!(
            "softplus".parse::<Activation>(),
            Err(VaeError::Activation(_))
        ));
    }

    #[test]
    fn relu_masks_gradient() {
        let mut m = Matrix::from_vec(1, 3, vec![-1.0, 0.5, 2.0]);
        Activation::Relu.forward_matrix(&mut m);
        assert_eq!(m.data, vec![0.0, 0.5, 2.0]);
        let mut g = Matrix::from_vec(1, 3, vec![1.0, 1.0, 1.0]);
        Activation::Relu.backward(&mut g, &m);
        assert_eq!(g.data, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn sigmoid_is_stable_for_large_inputs() {
        assert!((sigmoid(100.0) - 1.0).abs() < 1e-6);
        assert!(sigmoid(-100.0) >= 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }
}
