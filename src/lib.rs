pub mod anneal;
pub mod config;
pub mod data;
pub mod error;
pub mod history;
pub mod layers;
pub mod logging;
pub mod loss;
pub mod math;
pub mod models;
pub mod optim;
pub mod presets;
pub mod rng;
pub mod sweep;
pub mod topology;
pub mod trainer;
pub mod util;
pub mod weights;

pub use error::{Result, VaeError};
