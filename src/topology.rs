//! Layer graphs of the encoder and decoder, rendered as Graphviz DOT
//! diagrams and plain-text summaries.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::layers::Dense;
use crate::models::Vae;

/// A node in a topology graph: a named layer with its output width.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerNode {
    pub name: String,
    pub kind: &'static str,
    pub units: usize,
    pub activation: Option<String>,
    pub params: usize,
}

/// A simple directed graph of layers. Edges are pairs of node indices.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    pub name: String,
    pub nodes: Vec<LayerNode>,
    pub edges: Vec<(usize, usize)>,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a node and return its index.
    pub fn add(&mut self, node: LayerNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Connect two nodes previously returned by `add`.
    pub fn connect(&mut self, from: usize, to: usize) {
        self.edges.push((from, to));
    }

    fn add_input(&mut self, name: &str, units: usize) -> usize {
        self.add(LayerNode {
            name: name.to_string(),
            kind: "InputLayer",
            units,
            activation: None,
            params: 0,
        })
    }

    fn add_dense(&mut self, layer: &Dense) -> usize {
        self.add(LayerNode {
            name: layer.name.clone(),
            kind: "Dense",
            units: layer.out_dim(),
            activation: Some(layer.activation.to_string()),
            params: layer.param_count(),
        })
    }

    /// Chain `layers` after node `prev`; returns the last node.
    fn add_chain<'a>(&mut self, mut prev: usize, layers: impl Iterator<Item = &'a Dense>) -> usize {
        for layer in layers {
            let idx = self.add_dense(layer);
            self.connect(prev, idx);
            prev = idx;
        }
        prev
    }

    /// `encoder_input -> dense* -> {z_mean, z_log_var} -> z`
    pub fn encoder(vae: &Vae) -> Self {
        let enc = &vae.encoder;
        let mut t = Topology::new("encoder");
        let input = t.add_input("encoder_input", vae.arch.input_dim);
        let last = t.add_chain(input, enc.hidden.layers.iter());
        let mean = t.add_dense(&enc.z_mean);
        let log_var = t.add_dense(&enc.z_log_var);
        t.connect(last, mean);
        t.connect(last, log_var);
        let z = t.add(LayerNode {
            name: "z".into(),
            kind: "Sampling",
            units: vae.latent_dim(),
            activation: None,
            params: 0,
        });
        t.connect(mean, z);
        t.connect(log_var, z);
        t
    }

    /// `z_sampling -> dense* -> decoder_output`
    pub fn decoder(vae: &Vae) -> Self {
        let dec = &vae.decoder;
        let mut t = Topology::new("decoder");
        let input = t.add_input("z_sampling", vae.latent_dim());
        let last = t.add_chain(input, dec.hidden.layers.iter());
        t.add_chain(last, std::iter::once(&dec.output));
        t
    }

    pub fn param_count(&self) -> usize {
        self.nodes.iter().map(|n| n.params).sum()
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", self.name);
        let _ = writeln!(out, "  rankdir=TB;");
        let _ = writeln!(out, "  node [shape=record];");
        for (i, n) in self.nodes.iter().enumerate() {
            let act = n
                .activation
                .as_deref()
                .map(|a| format!(" | {a}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  n{i} [label=\"{{{}: {}{act} | (None, {})}}\"];",
                n.name, n.kind, n.units
            );
        }
        for (from, to) in &self.edges {
            let _ = writeln!(out, "  n{from} -> n{to};");
        }
        out.push_str("}\n");
        out
    }

    /// Keras-style layer table.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model: \"{}\"", self.name);
        let _ = writeln!(out, "{:<28}{:<18}{:>10}", "Layer (type)", "Output Shape", "Param #");
        for n in &self.nodes {
            let _ = writeln!(
                out,
                "{:<28}{:<18}{:>10}",
                format!("{} ({})", n.name, n.kind),
                format!("(None, {})", n.units),
                n.params
            );
        }
        let _ = write!(out, "Total params: {}", self.param_count());
        out
    }

    pub fn write_dot(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_dot())?;
        Ok(())
    }
}

/// Log both summaries and write `vae_mlp_encoder.dot` and
/// `vae_mlp_decoder.dot` into `dir`.
pub fn emit_diagrams(vae: &Vae, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let encoder = Topology::encoder(vae);
    let decoder = Topology::decoder(vae);
    log::info!("\n{}", encoder.summary());
    log::info!("\n{}", decoder.summary());
    let enc_path = dir.join("vae_mlp_encoder.dot");
    let dec_path = dir.join("vae_mlp_decoder.dot");
    encoder.write_dot(&enc_path)?;
    decoder.write_dot(&dec_path)?;
    Ok((enc_path, dec_path))
}
