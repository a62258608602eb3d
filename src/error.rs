use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed .npy file {path}: {reason}")]
    Npy { path: String, reason: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown activation '{0}'")]
    Activation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The {0} split contains no samples")]
    EmptySplit(&'static str),
}

pub type Result<T> = std::result::Result<T, VaeError>;
