pub mod sequential;
pub mod vae;

pub use sequential::Sequential;
pub use vae::{
    reparameterize, reparameterize_with_noise, Decoder, Encoder, Vae, VaeArchitecture, VaeOutput,
    FEATURE_DIM,
};
