//! Named architectures compared before the grid sweep.

use crate::config::TrainConfig;
use crate::layers::Activation;
use crate::models::VaeArchitecture;

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub encoder_dims: &'static [usize],
    pub latent_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub save: bool,
    pub cutoff: usize,
}

impl Preset {
    /// The decoder mirrors the encoder.
    pub fn architecture(&self) -> VaeArchitecture {
        let encoder_dims = self.encoder_dims.to_vec();
        let decoder_dims = encoder_dims.iter().rev().copied().collect();
        VaeArchitecture::uniform(encoder_dims, decoder_dims, self.latent_dim, Activation::Relu)
    }

    /// `base` with this preset's run settings applied.
    pub fn train_config(&self, base: &TrainConfig) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            save: self.save,
            cutoff: self.cutoff,
            name: self.name.to_string(),
            ..base.clone()
        }
    }
}

const fn preset(name: &'static str, encoder_dims: &'static [usize], latent_dim: usize) -> Preset {
    Preset {
        name,
        encoder_dims,
        latent_dim,
        epochs: 25,
        batch_size: 128,
        save: true,
        cutoff: 5,
    }
}

pub const PRESETS: &[Preset] = &[
    preset("STANDARD", &[64, 32], 4),
    preset("STANDARD2", &[64, 32], 20),
    preset("BIG", &[128, 64], 4),
    preset("BIG2", &[128, 64], 20),
    preset("LARGE", &[256, 128], 4),
    preset("LARGE2", &[256, 128], 20),
    preset("DEEP", &[128, 64, 32], 4),
    preset("DEEP2", &[128, 64, 32], 20),
    preset("GRANDE_DELUXE", &[512, 256], 4),
    preset("GRANDE_DELUXE2", &[512, 256], 20),
    preset("DEEP_BLUE", &[256, 128, 128, 64], 4),
    Preset {
        epochs: 250,
        save: false,
        ..preset("DEEP_BLUE2", &[256, 128, 128, 64], 20)
    },
    preset("MEGATRON", &[1024, 512, 256], 20),
    preset("GIGATRON", &[1024, 512, 256, 128], 20),
    Preset {
        epochs: 200,
        batch_size: 64,
        cutoff: 25,
        ..preset("Big_Papa", &[256, 128], 20)
    },
];

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_mirrors_encoder() {
        let arch = find("deep_blue").unwrap().architecture();
        assert_eq!(arch.decoder_dims, vec![64, 128, 128, 256]);
        assert_eq!(arch.encoder_activations.len(), 4);
        assert!(arch.validate().is_ok());
    }

    #[test]
    fn overrides_apply() {
        let p = find("Big_Papa").unwrap();
        let cfg = p.train_config(&TrainConfig::default());
        assert_eq!((cfg.epochs, cfg.batch_size, cfg.cutoff), (200, 64, 25));
        assert_eq!(cfg.name, "Big_Papa");
    }
}
